//! Error types for local client infrastructure.

use thiserror::Error;

/// Client infrastructure error type.
///
/// Remote API failures are not represented here; those surface as
/// [`crate::gateway::GatewayError`] so callers can apply the logout policy.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Token storage could not be read or written.
    #[error("token storage error: {0}")]
    Storage(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The login redirect never arrived.
    #[error("timed out waiting for the login redirect")]
    RedirectTimeout,
    /// The loopback listener stopped before receiving a token.
    #[error("login redirect listener closed: {0}")]
    RedirectListener(String),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for client infrastructure operations.
pub type ClientResult<T> = Result<T, ClientError>;
