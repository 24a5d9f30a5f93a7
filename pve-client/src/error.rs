//! Client error types.

use thiserror::Error;

/// Errors returned by the Proxmox API facade.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-2xx status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client could not be built from its configuration.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The caller's cancellation token fired before the call completed.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Short, stable code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Api { .. } => "api",
            ClientError::Transport(_) => "transport",
            ClientError::Decode(_) => "decode",
            ClientError::InvalidConfig(_) => "config",
            ClientError::Cancelled => "cancelled",
        }
    }

    /// Whether the error means the addressed entity does not exist.
    ///
    /// Proxmox answers most lookups of missing objects with a 500 whose
    /// message ends in "does not exist", so both shapes are accepted.
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::Api { status, message } => {
                *status == 404 || message.contains("does not exist")
            }
            _ => false,
        }
    }
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, ClientError>;
