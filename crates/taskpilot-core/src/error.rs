// Error types for the client flows

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the session and verification flows
///
/// Nothing here is thrown past a component boundary: callers that render
/// state receive `display_message()` strings, and the two structural
/// variants (`Unauthorized`, `Expired`) are handled centrally by the
/// gateway and the verification controller respectively.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local validation failure - never reaches the network layer
    #[error("{0}")]
    Validation(String),

    /// The server replied 401; the session has been cleared
    #[error("Session expired. Please login again.")]
    Unauthorized,

    /// The verification flow is dead (expiry fetch failed, countdown
    /// elapsed or the reset call failed) and must be restarted
    #[error("{0}")]
    Expired(String),

    /// Non-success response with a server-provided message
    #[error("{0}")]
    Rejected(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    /// Create a flow-expiry error
    pub fn expired(msg: impl Into<String>) -> Self {
        ClientError::Expired(msg.into())
    }

    /// Create a server-rejection error
    pub fn rejected(msg: impl Into<String>) -> Self {
        ClientError::Rejected(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        ClientError::Network(msg.into())
    }

    /// Message suitable for an ephemeral banner
    ///
    /// Transport errors are collapsed to a generic message; everything else
    /// displays as-is.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Network(_) => "Network error. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}
