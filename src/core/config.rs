//! Configuration for the PDF Q&A client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{ClientError, ClientResult};

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "PDFQA_API_URL";
/// Environment variable overriding the token file location.
pub const TOKEN_PATH_ENV: &str = "PDFQA_TOKEN_PATH";
/// Environment variable overriding the loopback redirect port.
pub const REDIRECT_PORT_ENV: &str = "PDFQA_REDIRECT_PORT";
/// Environment variable overriding the request timeout (seconds).
pub const TIMEOUT_ENV: &str = "PDFQA_TIMEOUT_SECS";

/// Default API base URL.
const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Port the server redirects to after login.
const DEFAULT_REDIRECT_PORT: u16 = 5173;

/// Top-level client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the remote API.
    pub api_base_url: String,
    /// Where the bearer token is persisted between runs.
    pub token_path: PathBuf,
    /// Loopback port receiving the login redirect.
    pub redirect_port: u16,
    /// Request timeout. Question answering can be slow.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// How long to wait for the login redirect.
    #[serde(with = "duration_serde")]
    pub login_timeout: Duration,
    /// Lifetime of success notices before they auto-dismiss.
    #[serde(with = "duration_serde")]
    pub success_notice_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            token_path: PathBuf::from(".pdfqa").join("session.json"),
            redirect_port: DEFAULT_REDIRECT_PORT,
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            login_timeout: Duration::from_secs(300),
            success_notice_ttl: Duration::from_secs(3),
        }
    }
}

impl ClientConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from defaults overridden by `PDFQA_*` environment variables.
    ///
    /// Unparseable numeric overrides are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_base_url = url;
        }
        if let Ok(path) = std::env::var(TOKEN_PATH_ENV) {
            config.token_path = PathBuf::from(path);
        }
        if let Ok(port) = std::env::var(REDIRECT_PORT_ENV) {
            match port.parse() {
                Ok(port) => config.redirect_port = port,
                Err(_) => tracing::warn!("ignoring invalid {REDIRECT_PORT_ENV}={port}"),
            }
        }
        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            match secs.parse() {
                Ok(secs) => config.request_timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!("ignoring invalid {TIMEOUT_ENV}={secs}"),
            }
        }

        config
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the token file path.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api_base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "api_base_url must be http(s), got {}",
                url.scheme()
            )));
        }

        if self.redirect_port == 0 {
            return Err(ClientError::InvalidConfig(
                "redirect_port must be > 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "request_timeout must be > 0".to_string(),
            ));
        }

        if self.token_path.as_os_str().is_empty() {
            return Err(ClientError::InvalidConfig(
                "token_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed API base URL, normalized to end with a slash so joins keep the path.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be parsed.
    pub fn api_base(&self) -> ClientResult<Url> {
        let mut url = Url::parse(&self.api_base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// URL that starts the provider login flow.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be parsed.
    pub fn login_url(&self) -> ClientResult<Url> {
        Ok(self.api_base()?.join("login")?)
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
