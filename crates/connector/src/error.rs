//! Errors from fetching the customer listing.

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("customer API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("customer listing could not be decoded: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}
