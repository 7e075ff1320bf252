//! Shared HTTP client construction

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use credence_core::DEFAULT_TIMEOUT_SECS;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Fixed user agent; a browser UA is rotated in when unset
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Errors from outbound HTTP calls
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: String, status: u16 },

    #[error("Failed to parse {service} response: {reason}")]
    Parse { service: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{0} is not configured")]
    Disabled(String),
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create an HTTP client honouring the configured timeout
pub fn create_client(config: &HttpConfig) -> Result<Client, NetError> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_string());

    Client::builder()
        .timeout(config.timeout())
        .user_agent(user_agent)
        .build()
        .map_err(|e| NetError::ClientBuild(e.to_string()))
}

/// Fail with [`NetError::Status`] unless the response is 2xx
pub(crate) fn ensure_success(
    response: reqwest::Response,
    service: &str,
) -> Result<reqwest::Response, NetError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(NetError::Status {
            service: service.to_string(),
            status: response.status().as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_random_user_agent() {
        let ua = random_user_agent();
        assert!(ua.contains("Mozilla"));
    }

    #[test]
    fn test_create_client() {
        let config = HttpConfig {
            timeout_secs: 3,
            user_agent: Some("credence-test/0.1".to_string()),
        };
        assert!(create_client(&config).is_ok());
    }
}
