// Error types module

use pingora_core::{Error as PingoraError, ErrorType};
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;

/// Centralized error type for the proxy
///
/// Each variant maps to the HTTP status the client sees when the error ends
/// a request.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cache maintenance failure (only clearing can fail)
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Origin could not be reached or timed out
    #[error("Failed to reach origin server: {0}")]
    Upstream(String),

    /// Outbound request could not be built, or another local failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status returned to the client for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::Upstream(_) => 502,
            ProxyError::Config(_) | ProxyError::Cache(_) | ProxyError::Internal(_) => 500,
        }
    }

    /// Convert into a Pingora error carrying the response status
    pub fn into_pingora(self) -> Box<PingoraError> {
        PingoraError::explain(ErrorType::HTTPStatus(self.status_code()), self.to_string())
    }
}
