//! Process-wide bearer token holder.
//!
//! The token arrives either from durable storage or as the `access_token` query
//! parameter of the login redirect. Logout is idempotent and can race with any
//! number of in-flight requests discovering a 401 at the same time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use url::Url;

use crate::core::errors::ClientResult;
use crate::session::storage::TokenStorage;

/// Query parameter carrying the token on the login redirect.
pub const TOKEN_PARAM: &str = "access_token";

/// Snapshot of the authentication state.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Current bearer token.
    pub token: Option<String>,
    /// Whether a token is held.
    pub authenticated: bool,
}

impl Session {
    fn from_token(token: Option<String>) -> Self {
        let authenticated = token.is_some();
        Self {
            token,
            authenticated,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

/// Where the token found during initialization came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenSource {
    /// Durable storage from a previous run.
    Storage,
    /// Query parameter of the login redirect.
    Redirect,
}

/// Result of [`TokenStore::initialize`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InitOutcome {
    /// Source of the token, or `None` when the session starts unauthenticated.
    pub source: Option<TokenSource>,
    /// Location with the credential removed; the host should replace its address with it.
    pub cleaned_location: Option<Url>,
}

/// Holder of the bearer token, backed by durable storage.
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    token: Mutex<Option<String>>,
    epoch: AtomicU64,
}

impl TokenStore {
    /// Create an empty store over `storage`. Call [`Self::initialize`] before use.
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            storage,
            token: Mutex::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the token from storage, falling back to the redirect parameter in `location`.
    ///
    /// A credential present in `location` is always stripped from the returned
    /// location, even when storage already supplied a token.
    ///
    /// # Errors
    /// Returns an error if a redirect token cannot be persisted.
    pub fn initialize(&self, location: Option<&Url>) -> ClientResult<InitOutcome> {
        let redirect_token = location.and_then(token_from_location);
        let cleaned_location = match (location, &redirect_token) {
            (Some(url), Some(_)) => Some(strip_credential(url)),
            _ => None,
        };

        let stored = match self.storage.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!("ignoring unreadable token storage: {err}");
                None
            }
        };

        let source = if let Some(token) = stored {
            self.set_token(token);
            Some(TokenSource::Storage)
        } else if let Some(token) = redirect_token {
            self.login(&token)?;
            Some(TokenSource::Redirect)
        } else {
            None
        };

        match source {
            Some(source) => info!(?source, "session initialized"),
            None => debug!("no token available, session unauthenticated"),
        }

        Ok(InitOutcome {
            source,
            cleaned_location,
        })
    }

    /// Accept a login redirect, replacing any current token.
    ///
    /// Returns the cleaned location, or `None` when `location` carries no token.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted.
    pub fn accept_redirect(&self, location: &Url) -> ClientResult<Option<Url>> {
        let Some(token) = token_from_location(location) else {
            return Ok(None);
        };
        self.login(&token)?;
        info!("session established from login redirect");
        Ok(Some(strip_credential(location)))
    }

    /// Persist and adopt `token`, starting a new session epoch.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted.
    pub fn login(&self, token: &str) -> ClientResult<()> {
        self.storage.store(token)?;
        self.set_token(token.to_string());
        Ok(())
    }

    fn set_token(&self, token: String) {
        let mut slot = self.slot();
        *slot = Some(token);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Clear the in-memory and persisted token.
    ///
    /// Returns `true` only for the call that actually ended the session.
    pub fn logout(&self) -> bool {
        let ended = {
            let mut slot = self.slot();
            let ended = slot.take().is_some();
            if ended {
                self.epoch.fetch_add(1, Ordering::SeqCst);
            }
            ended
        };
        self.finish_logout(ended);
        ended
    }

    /// Log out only if the session started at `epoch` is still the current one.
    ///
    /// A rejection observed by a request from an earlier session leaves the
    /// current session untouched and returns `false`.
    pub fn end_session(&self, epoch: u64) -> bool {
        {
            let mut slot = self.slot();
            if self.epoch.load(Ordering::SeqCst) != epoch || slot.is_none() {
                return false;
            }
            *slot = None;
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }
        self.finish_logout(true);
        true
    }

    fn finish_logout(&self, ended: bool) {
        if ended {
            info!("session ended");
        }
        if let Err(err) = self.storage.clear() {
            warn!("failed to clear persisted token: {err}");
        }
    }

    /// Current token, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.slot().clone()
    }

    /// Snapshot of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::from_token(self.token())
    }

    /// Whether a token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.slot().is_some()
    }

    /// Counter bumped on every login and logout; used to discard stale completions.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

/// Extract a non-empty `access_token` query parameter.
#[must_use]
pub fn token_from_location(location: &Url) -> Option<String> {
    location
        .query_pairs()
        .find(|(key, _)| key == TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// Location reduced to its path, so the credential leaves history and bookmarks.
#[must_use]
pub fn strip_credential(location: &Url) -> Url {
    let mut cleaned = location.clone();
    cleaned.set_query(None);
    cleaned.set_fragment(None);
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryTokenStorage;

    fn store_with(storage: MemoryTokenStorage) -> (Arc<MemoryTokenStorage>, TokenStore) {
        let storage = Arc::new(storage);
        let store = TokenStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn initializes_from_storage_first() {
        let (_, store) = store_with(MemoryTokenStorage::with_token("T1"));
        let location = Url::parse("http://localhost:5173/?access_token=T2").unwrap();

        let outcome = store.initialize(Some(&location)).unwrap();

        assert_eq!(outcome.source, Some(TokenSource::Storage));
        assert_eq!(store.token().as_deref(), Some("T1"));
        assert_eq!(
            outcome.cleaned_location.unwrap().as_str(),
            "http://localhost:5173/"
        );
    }

    #[test]
    fn initializes_from_redirect_and_persists() {
        let (storage, store) = store_with(MemoryTokenStorage::new());
        let location = Url::parse("http://localhost:5173/app?access_token=abc&x=1#top").unwrap();

        let outcome = store.initialize(Some(&location)).unwrap();

        assert_eq!(outcome.source, Some(TokenSource::Redirect));
        assert_eq!(storage.load().unwrap().as_deref(), Some("abc"));
        let cleaned = outcome.cleaned_location.unwrap();
        assert_eq!(cleaned.as_str(), "http://localhost:5173/app");
        assert!(store.session().authenticated);
    }

    #[test]
    fn stays_unauthenticated_without_token() {
        let (_, store) = store_with(MemoryTokenStorage::new());
        let location = Url::parse("http://localhost:5173/?access_token=").unwrap();

        let outcome = store.initialize(Some(&location)).unwrap();

        assert_eq!(outcome, InitOutcome::default());
        assert_eq!(
            store.session(),
            Session {
                token: None,
                authenticated: false
            }
        );
    }

    #[test]
    fn logout_is_idempotent() {
        let (storage, store) = store_with(MemoryTokenStorage::with_token("T1"));
        store.initialize(None).unwrap();
        let epoch = store.epoch();

        assert!(store.logout());
        assert!(!store.logout());
        assert!(!store.is_authenticated());
        assert!(storage.load().unwrap().is_none());
        assert_eq!(store.epoch(), epoch + 1);
    }

    #[test]
    fn accept_redirect_replaces_token() {
        let (_, store) = store_with(MemoryTokenStorage::with_token("old"));
        store.initialize(None).unwrap();

        let plain = Url::parse("http://localhost:5173/").unwrap();
        assert!(store.accept_redirect(&plain).unwrap().is_none());

        let redirect = Url::parse("http://localhost:5173/?access_token=new").unwrap();
        let cleaned = store.accept_redirect(&redirect).unwrap();
        assert!(cleaned.is_some());
        assert_eq!(store.token().as_deref(), Some("new"));
    }

    #[test]
    fn end_session_ignores_earlier_epochs() {
        let (storage, store) = store_with(MemoryTokenStorage::with_token("T1"));
        store.initialize(None).unwrap();
        let first = store.epoch();

        store.logout();
        store.login("T2").unwrap();

        assert!(!store.end_session(first));
        assert_eq!(store.token().as_deref(), Some("T2"));
        assert_eq!(storage.load().unwrap().as_deref(), Some("T2"));

        let current = store.epoch();
        assert!(store.end_session(current));
        assert!(!store.end_session(current));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = Session::from_token(Some("secret".to_string()));
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret"));
    }
}
