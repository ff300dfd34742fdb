//! Client configuration

use std::str::FromStr;
use std::sync::Arc;

use crate::{ClientError, ClientResult, OrderApi};

/// How the core reaches the order API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientType {
    /// HTTP client for REST API calls
    #[default]
    Http,
    /// In-memory API in the same process (requires the `in-process` feature)
    InProcess,
}

impl FromStr for ClientType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(ClientType::Http),
            "in-process" | "memory" => Ok(ClientType::InProcess),
            other => Err(ClientError::Configuration(format!(
                "unknown client type: {other}"
            ))),
        }
    }
}

/// Client configuration for connecting to the order API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g., "http://localhost:5000/api")
    pub base_url: String,

    /// Client type
    pub client_type: ClientType,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    /// Create a new client configuration with HTTP client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_type: ClientType::Http,
            token: None,
            timeout: 30,
        }
    }

    /// Configuration for the in-memory API
    pub fn in_process() -> Self {
        Self::new("memory://").with_client_type(ClientType::InProcess)
    }

    /// Set the client type
    pub fn with_client_type(mut self, client_type: ClientType) -> Self {
        self.client_type = client_type;
        self
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> ClientResult<crate::HttpClient> {
        crate::HttpClient::new(self)
    }

    /// Create the backend selected by `client_type`
    pub fn build(&self) -> ClientResult<Arc<dyn OrderApi>> {
        match self.client_type {
            ClientType::Http => Ok(Arc::new(self.build_http_client()?)),
            #[cfg(feature = "in-process")]
            ClientType::InProcess => Ok(Arc::new(crate::InProcessApi::new())),
            #[cfg(not(feature = "in-process"))]
            ClientType::InProcess => Err(ClientError::Configuration(
                "in-process backend requires the `in-process` feature".into(),
            )),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000/api")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://pos.local/api")
            .with_token("secret")
            .with_timeout(5);
        assert_eq!(config.client_type, ClientType::Http);
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, 5);
        assert_eq!(ClientConfig::in_process().client_type, ClientType::InProcess);
    }

    #[test]
    fn test_client_type_parse() {
        assert_eq!("http".parse::<ClientType>().unwrap(), ClientType::Http);
        assert_eq!(" In-Process ".parse::<ClientType>().unwrap(), ClientType::InProcess);
        assert_eq!("memory".parse::<ClientType>().unwrap(), ClientType::InProcess);
        assert!(matches!(
            "grpc".parse::<ClientType>(),
            Err(ClientError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_build_selects_backend() {
        let http = ClientConfig::new("http://127.0.0.1:9/api").build();
        assert!(http.is_ok());

        let memory = ClientConfig::in_process().build();
        #[cfg(feature = "in-process")]
        {
            let api = memory.unwrap();
            assert!(api.find_session(5).await.unwrap().is_none());
        }
        #[cfg(not(feature = "in-process"))]
        assert!(matches!(memory, Err(ClientError::Configuration(_))));
    }
}
