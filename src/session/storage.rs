//! Durable storage for the bearer token.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::errors::{ClientError, ClientResult};

/// Durable client storage for a single token.
pub trait TokenStorage: Send + Sync {
    /// Load the persisted token, if any.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    fn load(&self) -> ClientResult<Option<String>>;

    /// Persist a token, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    fn store(&self, token: &str) -> ClientResult<()>;

    /// Remove the persisted token. Succeeds when nothing is stored.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    fn clear(&self) -> ClientResult<()>;
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
}

/// Token persisted as a small JSON file.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Use `path` as the token file. Parent directories are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> ClientResult<Option<String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let stored: StoredSession = serde_json::from_str(&raw)?;
        if stored.access_token.is_empty() {
            return Ok(None);
        }
        Ok(Some(stored.access_token))
    }

    fn store(&self, token: &str) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(&StoredSession {
            access_token: token.to_string(),
        })?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local storage, mainly for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> ClientResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.token
            .lock()
            .map_err(|_| ClientError::Storage("token mutex poisoned".to_string()))
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn store(&self, token: &str) -> ClientResult<()> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}
