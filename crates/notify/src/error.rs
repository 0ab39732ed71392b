//! Error types for the notification subsystem.
//!
//! None of these reach store callers: the store logs them and keeps its
//! previous state.

use certwatch_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("persistence failed: {0}")]
    Storage(#[from] StorageError),

    #[error("template rendering failed: {0}")]
    Template(String),

    #[error("invalid notification spec: {0}")]
    InvalidSpec(String),
}
