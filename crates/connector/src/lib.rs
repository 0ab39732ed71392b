//! Customer listing access and the alert service built on top of it.

pub mod cache;
pub mod error;
pub mod service;
pub mod source;

pub use cache::CustomerCache;
pub use error::ConnectorError;
pub use service::{AlertService, RefreshOutcome};
pub use source::{CustomerSource, HttpCustomerSource};
