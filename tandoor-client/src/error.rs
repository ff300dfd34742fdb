//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected by the server (bad status value, malformed body, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server unreachable or temporarily refusing requests
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::Unavailable(_) | ClientError::Internal(_) => true,
            _ => false,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
