//! Error types for the XRPC agent

use thiserror::Error;

/// Agent error
#[derive(Debug, Error)]
pub enum AgentError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an XRPC error body
    #[error("XRPC error {status} {error}: {message}")]
    Xrpc {
        status: u16,
        error: String,
        message: String,
    },

    /// Operation requires an authenticated session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// AT-URI could not be parsed
    #[error("Invalid AT-URI: {0}")]
    InvalidUri(String),
}

impl AgentError {
    /// XRPC error name (e.g. "ExpiredToken"), if the server sent one
    pub fn xrpc_error(&self) -> Option<&str> {
        match self {
            AgentError::Xrpc { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
