//! Provider error types.

use pve_client::ClientError;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Errors that can occur while reconciling a resource.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A remote call failed. `summary` names the operation,
    /// e.g. "Error creating NFS storage class".
    #[error("{summary}: {source}")]
    Remote {
        summary: String,
        #[source]
        source: ClientError,
    },

    /// The configuration was rejected before any remote call.
    #[error("invalid value for {attribute}: {message}")]
    Invalid { attribute: String, message: String },

    /// A document from the host did not match the resource model.
    #[error("malformed {what}: {source}")]
    Document {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The entity is expected to exist but does not.
    #[error("{what} '{id}' does not exist")]
    NotFound { what: String, id: String },

    /// No resource or data source is registered under this type name.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// The request's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Schema validation produced errors.
    #[error("configuration is invalid")]
    Validation(Diagnostics),
}

impl ProviderError {
    /// Build a `map_err` adapter that wraps a client error under `summary`.
    ///
    /// Cancellation is reported as such rather than as a remote failure.
    pub fn remote(summary: impl Into<String>) -> impl FnOnce(ClientError) -> ProviderError {
        let summary = summary.into();
        move |source| match source {
            ClientError::Cancelled => ProviderError::Cancelled,
            source => ProviderError::Remote { summary, source },
        }
    }

    pub fn invalid(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Invalid {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Render as host diagnostics.
    pub fn to_diagnostics(&self) -> Diagnostics {
        match self {
            ProviderError::Remote { summary, source } => {
                Diagnostic::error(summary.clone(), source.to_string()).into()
            }
            ProviderError::Invalid { attribute, message } => {
                Diagnostic::error("Invalid attribute value", message.clone())
                    .at(attribute.clone())
                    .into()
            }
            ProviderError::Document { what, source } => {
                Diagnostic::error(format!("Malformed {}", what), source.to_string()).into()
            }
            ProviderError::NotFound { .. } => {
                Diagnostic::error("Resource not found", self.to_string()).into()
            }
            ProviderError::UnknownType(name) => Diagnostic::error(
                "Unsupported type",
                format!("no resource or data source named '{}'", name),
            )
            .into(),
            ProviderError::Cancelled => Diagnostic::error(
                "Operation cancelled",
                "the request was cancelled before it completed",
            )
            .into(),
            ProviderError::Validation(diagnostics) => diagnostics.clone(),
        }
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
