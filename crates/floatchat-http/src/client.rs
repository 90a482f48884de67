// ABOUTME: Shared reqwest client with timeouts and transient-failure retry
// ABOUTME: Maps reqwest and HTTP status failures onto TransportError

use floatchat_core::{EndpointConfig, TransportError};
use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client bound to one endpoint base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry_attempts: config.retry_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path below the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    /// Send a request, retrying connection failures, timeouts and 5xx
    /// responses with linear backoff. `build` is called once per attempt
    /// since request bodies are consumed by sending.
    pub async fn execute<F>(&self, label: &str, build: F) -> Result<Response, TransportError>
    where
        F: Fn() -> Result<RequestBuilder, TransportError>,
    {
        let mut attempt = 1;
        loop {
            let result = match build()?.send().await {
                Ok(response) => check_status(response).await,
                Err(e) => Err(map_reqwest_error(e)),
            };

            match result {
                Ok(response) => {
                    debug!(request = label, attempt, "Request succeeded");
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.retry_attempts => {
                    let delay = self.retry_backoff * attempt;
                    warn!(
                        request = label,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        code: status.as_u16(),
        body,
    })
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() {
        TransportError::InvalidResponse(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> HttpClient {
        HttpClient::new(&EndpointConfig {
            base_url: base_url.to_string(),
            ..EndpointConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let c = client("http://localhost:7166/api/");
        assert_eq!(c.base_url(), "http://localhost:7166/api");
        assert_eq!(c.url("/chat"), "http://localhost:7166/api/chat");
        assert_eq!(c.url("products/segments"), "http://localhost:7166/api/products/segments");
    }

    #[test]
    fn test_zero_retry_attempts_clamped() {
        let c = HttpClient::new(&EndpointConfig {
            retry_attempts: 0,
            ..EndpointConfig::default()
        })
        .unwrap();
        assert_eq!(c.retry_attempts, 1);
    }
}
