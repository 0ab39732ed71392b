//! Where customer records come from.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use certwatch_core::config::ApiConfig;
use certwatch_core::Customer;

use crate::error::ConnectorError;

/// Read-only access to the customer listing owned by the customer backend.
#[async_trait]
pub trait CustomerSource: Send + Sync {
    async fn fetch_customers(&self) -> Result<Vec<Customer>, ConnectorError>;

    /// Human-readable name for logs (e.g., "http").
    fn source_name(&self) -> &str;
}

/// `GET {base_url}/customers` against the REST backend.
pub struct HttpCustomerSource {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpCustomerSource {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ConnectorError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConnectorError::Config(format!(
                "customer API url must be http(s): '{base_url}'"
            )));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, token, http })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self, ConnectorError> {
        Self::new(
            &api.base_url,
            api.token.clone(),
            Duration::from_secs(api.timeout_secs),
        )
    }

    pub fn customers_url(&self) -> String {
        format!("{}/customers", self.base_url)
    }
}

#[async_trait]
impl CustomerSource for HttpCustomerSource {
    async fn fetch_customers(&self) -> Result<Vec<Customer>, ConnectorError> {
        let url = self.customers_url();
        let mut request = self.http.get(&url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ConnectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let customers: Vec<Customer> =
            serde_json::from_str(&body).map_err(|e| ConnectorError::Decode(e.to_string()))?;
        debug!(url = %url, count = customers.len(), "Customers fetched");
        Ok(customers)
    }

    fn source_name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customers_url_strips_trailing_slash() {
        let source = HttpCustomerSource::new("http://localhost:5000/api/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(source.customers_url(), "http://localhost:5000/api/customers");
    }

    #[test]
    fn rejects_non_http_urls() {
        let result = HttpCustomerSource::new("localhost:5000", None, Duration::from_secs(1));
        assert!(matches!(result, Err(ConnectorError::Config(_))));
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        // Port 9 (discard) on loopback is essentially never serving HTTP.
        let source = HttpCustomerSource::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
        assert!(source.fetch_customers().await.is_err());
    }
}
