//! HTTP client utilities.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::NetworkConfig;

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client from the network section of the configuration
    pub fn new(config: &NetworkConfig) -> Result<Self, reqwest::Error> {
        Self::build(
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    /// Create a new HTTP client with a custom user agent and default timeouts
    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        Self::build(user_agent, Duration::from_secs(30), Duration::from_secs(10))
    }

    fn build(
        user_agent: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config() {
        let config = NetworkConfig::default();
        assert!(HttpClient::new(&config).is_ok());
    }

    #[test]
    fn test_client_shares_underlying_pool() {
        let client = HttpClient::with_user_agent("paperfetch-test").unwrap();
        let cloned = client.clone();
        assert!(Arc::ptr_eq(&client.client, &cloned.client));
    }
}
