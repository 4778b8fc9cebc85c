//! Failure taxonomy for remote operations.

use std::fmt;

use thiserror::Error;

/// Remote operation being attempted, used to scope user-visible messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    /// `GET /documents/`.
    ListDocuments,
    /// `POST /upload/`.
    Upload,
    /// `DELETE /documents/{id}`.
    Delete,
    /// `POST /ask/`.
    Ask,
    /// `DELETE /documents/cleanup/`.
    Cleanup,
}

impl Operation {
    /// Stable name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListDocuments => "list_documents",
            Self::Upload => "upload",
            Self::Delete => "delete",
            Self::Ask => "ask",
            Self::Cleanup => "cleanup",
        }
    }

    /// Message shown when the server answers with an error status.
    #[must_use]
    pub const fn status_message(self) -> &'static str {
        match self {
            Self::ListDocuments => "Failed to fetch documents",
            Self::Upload => "Failed to upload document",
            Self::Delete => "Failed to delete document",
            Self::Ask => "Failed to get answer",
            Self::Cleanup => "Failed to clean up documents",
        }
    }

    /// Message shown when no usable response arrived.
    #[must_use]
    pub const fn network_message(self) -> &'static str {
        match self {
            Self::ListDocuments => "Failed to fetch documents",
            Self::Upload => "Error uploading document",
            Self::Delete => "Error deleting document",
            Self::Ask => "Error processing question",
            Self::Cleanup => "Error cleaning up documents",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a user-level operation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GatewayError {
    /// The server rejected the credential (or none was held). The session is already torn down.
    #[error("unauthorized")]
    Unauthorized,
    /// Input rejected locally; no request was issued.
    #[error("{0}")]
    Validation(String),
    /// The remote operation failed.
    #[error("{message}")]
    Operation {
        /// Operation that failed.
        operation: Operation,
        /// User-visible message.
        message: String,
        /// HTTP status, when the server answered.
        status: Option<u16>,
    },
}

impl GatewayError {
    /// Message to surface to the user. `None` for unauthorized failures, which are handled by logout.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized => None,
            Self::Validation(message) | Self::Operation { message, .. } => Some(message),
        }
    }

    /// Whether this failure ended the session.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Convenience result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Raw failure reported by a [`crate::gateway::RemoteApi`] implementation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RemoteFailure {
    /// The server answered with a non-success status.
    #[error("http status {0}")]
    Status(u16),
    /// No response arrived.
    #[error("network error: {0}")]
    Network(String),
    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The request could not be built.
    #[error("invalid request: {0}")]
    Request(String),
}

impl RemoteFailure {
    /// Whether the server rejected the credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(401))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_has_no_user_message() {
        assert_eq!(GatewayError::Unauthorized.user_message(), None);
        let err = GatewayError::Operation {
            operation: Operation::Ask,
            message: Operation::Ask.status_message().to_string(),
            status: Some(500),
        };
        assert_eq!(err.user_message(), Some("Failed to get answer"));
        assert_eq!(err.to_string(), "Failed to get answer");
    }

    #[test]
    fn only_401_is_unauthorized() {
        assert!(RemoteFailure::Status(401).is_unauthorized());
        assert!(!RemoteFailure::Status(403).is_unauthorized());
        assert!(!RemoteFailure::Network("reset".into()).is_unauthorized());
    }
}
