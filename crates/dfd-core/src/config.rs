//! HTTP client settings for talking to the Data for Dummies API.

use std::time::Duration;

use reqwest::Client;

/// Default API origin used by the web app during development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Build the pooled HTTP client. Clone is cheap: reqwest::Client is Arc inside.
    pub fn build_client(&self) -> reqwest::Result<Client> {
        Client::builder().timeout(self.timeout).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn test_with_base_url_keeps_default_timeout() {
        let config = ClientConfig::with_base_url("https://api.example.com");
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout, Duration::from_secs(REQUEST_TIMEOUT_SECS));
        assert!(config.build_client().is_ok());
    }
}
