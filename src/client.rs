//! Client facade composing session, documents, conversations and the gateway.
//!
//! Failures are funnelled through one place: unauthorized responses tear the
//! whole session down, everything else becomes an error notice. Responses that
//! arrive after the session they belong to has ended are discarded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use url::Url;

use crate::conversation::ConversationStore;
use crate::core::config::ClientConfig;
use crate::core::document::{Document, UploadFile};
use crate::core::errors::ClientResult;
use crate::core::ids::DocumentId;
use crate::core::message::Message;
use crate::documents::{DocumentRegistry, validate_selection};
use crate::gateway::{
    AskRequest, CleanupReport, GatewayError, GatewayResult, HttpApi, RemoteApi, RequestGateway,
};
use crate::session::{FileTokenStorage, InitOutcome, Session, TokenStorage, TokenStore};
use crate::view::{NoticeBoard, ViewProjection, ViewSnapshot};

/// Shown after a successful upload.
pub const UPLOAD_SUCCESS: &str = "Document uploaded successfully!";
/// Shown after a successful delete.
pub const DELETE_SUCCESS: &str = "Document deleted successfully!";

/// Counts an upload as in flight for as long as it lives.
struct UploadGuard<'a>(&'a AtomicUsize);

impl<'a> UploadGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stateful PDF Q&A client.
pub struct QaClient {
    config: ClientConfig,
    tokens: Arc<TokenStore>,
    gateway: RequestGateway,
    documents: DocumentRegistry,
    conversations: ConversationStore,
    notices: NoticeBoard,
    uploads_in_flight: AtomicUsize,
    question: Mutex<String>,
}

impl QaClient {
    /// Build a client over explicit storage and API implementations.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn TokenStorage>,
        api: Arc<dyn RemoteApi>,
    ) -> Self {
        let tokens = Arc::new(TokenStore::new(storage));
        let gateway = RequestGateway::new(api, tokens.clone());
        let notices = NoticeBoard::new(config.success_notice_ttl);

        Self {
            config,
            tokens,
            gateway,
            documents: DocumentRegistry::new(),
            conversations: ConversationStore::new(),
            notices,
            uploads_in_flight: AtomicUsize::new(0),
            question: Mutex::new(String::new()),
        }
    }

    /// Build a client with file-backed token storage and the HTTP API.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let storage = Arc::new(FileTokenStorage::new(config.token_path.clone()));
        let api = Arc::new(HttpApi::new(&config)?);
        Ok(Self::new(config, storage, api))
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ----- session -------------------------------------------------------

    /// Restore the session from storage or the redirect parameter in `location`,
    /// then fetch documents if authenticated.
    ///
    /// Fetch failures are reported through notices, not as errors.
    ///
    /// # Errors
    /// Returns an error if a redirect token cannot be persisted.
    pub async fn initialize(&self, location: Option<&Url>) -> ClientResult<InitOutcome> {
        let outcome = self.tokens.initialize(location)?;
        if self.tokens.is_authenticated() {
            if let Err(err) = self.refresh_documents().await {
                debug!("initial document fetch failed: {err}");
            }
        }
        Ok(outcome)
    }

    /// URL that starts the provider login.
    ///
    /// # Errors
    /// Returns an error if the API base URL is invalid.
    pub fn login_url(&self) -> ClientResult<Url> {
        self.config.login_url()
    }

    /// Adopt the token carried by a login redirect and load the new session's documents.
    ///
    /// Returns the cleaned location, or `None` when `callback` carries no token.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted.
    pub async fn complete_login(&self, callback: &Url) -> ClientResult<Option<Url>> {
        let cleaned = self.tokens.accept_redirect(callback)?;
        if cleaned.is_some() {
            self.reset_state();
            if let Err(err) = self.refresh_documents().await {
                debug!("document fetch after login failed: {err}");
            }
        }
        Ok(cleaned)
    }

    /// End the session and drop all session-owned state. Idempotent.
    pub fn logout(&self) {
        self.tokens.logout();
        self.reset_state();
    }

    fn reset_state(&self) {
        self.documents.clear();
        self.conversations.clear();
        debug!("client state reset");
    }

    /// Snapshot of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.tokens.session()
    }

    /// Whether a token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.tokens.epoch() != epoch
    }

    /// Apply the failure policy to a request issued during session `epoch`
    /// and hand the error back to the caller.
    ///
    /// Failures from a session that has since ended have no side effects.
    fn fail(&self, err: GatewayError, epoch: u64) -> GatewayError {
        if self.is_stale(epoch) {
            debug!("failure from an ended session ignored: {err}");
            return err;
        }
        match &err {
            GatewayError::Unauthorized => {
                if self.tokens.end_session(epoch) {
                    info!("logged out after unauthorized response");
                    self.reset_state();
                }
            }
            GatewayError::Validation(message) | GatewayError::Operation { message, .. } => {
                self.notices.error(message.clone());
            }
        }
        err
    }

    fn discard_stale<T>(&self, what: &str) -> GatewayResult<T> {
        debug!("discarding {what} from an ended session");
        Err(GatewayError::Unauthorized)
    }

    // ----- documents -----------------------------------------------------

    /// Replace the registry with the server's document list.
    ///
    /// # Errors
    /// Returns `Unauthorized` (state reset if the issuing session was current) or an operation failure
    /// (registry unchanged, error notice raised).
    pub async fn refresh_documents(&self) -> GatewayResult<Vec<Document>> {
        let epoch = self.tokens.epoch();
        match self.gateway.list_documents().await {
            Ok(documents) => {
                if self.is_stale(epoch) {
                    return self.discard_stale("document list");
                }
                self.documents.replace_all(documents.clone());
                Ok(documents)
            }
            Err(err) => Err(self.fail(err, epoch)),
        }
    }

    /// Upload the selected file. An empty selection is a no-op.
    ///
    /// # Errors
    /// Returns a validation error without any request for anything but a single
    /// PDF, `Unauthorized`, or an operation failure.
    pub async fn upload(&self, files: Vec<UploadFile>) -> GatewayResult<Option<Document>> {
        let epoch = self.tokens.epoch();
        let file = match validate_selection(files) {
            Ok(Some(file)) => file,
            Ok(None) => return Ok(None),
            Err(err) => return Err(self.fail(err, epoch)),
        };

        let _uploading = UploadGuard::new(&self.uploads_in_flight);
        self.notices.clear();
        debug!(filename = %file.filename, "uploading document");

        match self.gateway.upload_document(file).await {
            Ok(document) => {
                if self.is_stale(epoch) {
                    return self.discard_stale("upload result");
                }
                self.documents.add(document.clone());
                self.notices.success(UPLOAD_SUCCESS);
                Ok(Some(document))
            }
            Err(err) => Err(self.fail(err, epoch)),
        }
    }

    /// Delete a document, dropping its transcript and selection on success.
    ///
    /// # Errors
    /// Returns `Unauthorized` or an operation failure; local state is untouched on failure.
    pub async fn delete_document(&self, id: &DocumentId) -> GatewayResult<Option<Document>> {
        let epoch = self.tokens.epoch();
        match self.gateway.delete_document(id).await {
            Ok(()) => {
                if self.is_stale(epoch) {
                    return self.discard_stale("delete result");
                }
                let removed = self.documents.remove(id);
                self.conversations.forget(id);
                self.notices.success(DELETE_SUCCESS);
                Ok(removed)
            }
            Err(err) => Err(self.fail(err, epoch)),
        }
    }

    /// Ask the server to prune orphaned documents, then refetch the list.
    ///
    /// Transcripts of documents that disappeared are dropped with them.
    ///
    /// # Errors
    /// Returns `Unauthorized` or an operation failure.
    pub async fn cleanup_documents(&self) -> GatewayResult<CleanupReport> {
        let epoch = self.tokens.epoch();
        let report = match self.gateway.cleanup_documents().await {
            Ok(report) => report,
            Err(err) => return Err(self.fail(err, epoch)),
        };

        let before = self.documents.list();
        let after = self.refresh_documents().await?;
        for gone in before
            .iter()
            .filter(|doc| !after.iter().any(|kept| kept.id == doc.id))
        {
            self.conversations.forget(&gone.id);
        }

        self.notices.success(report.detail.clone());
        Ok(report)
    }

    /// Snapshot of the registry.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.documents.list()
    }

    // ----- conversation --------------------------------------------------

    /// Select a registered document, creating its transcript lazily.
    ///
    /// # Errors
    /// Returns a validation error for ids not in the registry.
    pub fn select_document(&self, id: &DocumentId) -> GatewayResult<()> {
        if !self.documents.contains(id) {
            let err = GatewayError::Validation(format!("Unknown document {id}"));
            return Err(self.fail(err, self.tokens.epoch()));
        }
        self.conversations.select(id);
        Ok(())
    }

    /// Currently selected document id.
    #[must_use]
    pub fn selection(&self) -> Option<DocumentId> {
        self.conversations.selection()
    }

    /// Transcript for `id`, `None` if never created.
    #[must_use]
    pub fn transcript(&self, id: &DocumentId) -> Option<Vec<Message>> {
        self.conversations.transcript(id)
    }

    fn draft(&self) -> MutexGuard<'_, String> {
        self.question.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the question draft.
    pub fn set_question(&self, text: impl Into<String>) {
        *self.draft() = text.into();
    }

    /// Current question draft.
    #[must_use]
    pub fn question(&self) -> String {
        self.draft().clone()
    }

    /// Ask about `id`. Blank questions are a no-op returning `Ok(None)`.
    ///
    /// The user message is appended before the request and stays on failure. On
    /// success the answer is appended to `id`'s transcript, whatever is selected
    /// by then; `Ok(None)` means the transcript was dropped in the meantime.
    ///
    /// # Errors
    /// Returns `Unauthorized` (state reset if the issuing session was current) or an operation failure.
    pub async fn ask(&self, id: &DocumentId, question: &str) -> GatewayResult<Option<Message>> {
        if question.trim().is_empty() {
            return Ok(None);
        }

        let epoch = self.tokens.epoch();
        self.notices.clear_error();
        let pending = self.conversations.begin_question(id, question);
        let request = AskRequest {
            document_id: id.clone(),
            question: question.to_string(),
        };

        match self.gateway.ask(&request).await {
            Ok(_) if self.is_stale(epoch) => {
                self.conversations.abandon_question(&pending);
                debug!(%id, "answer from an ended session dropped");
                Ok(None)
            }
            Ok(response) => Ok(self
                .conversations
                .complete_question(&pending, response.answer)),
            Err(err) => {
                self.conversations.abandon_question(&pending);
                Err(self.fail(err, epoch))
            }
        }
    }

    /// Ask the draft question about the selected document, clearing the draft once settled.
    ///
    /// # Errors
    /// Same as [`Self::ask`].
    pub async fn submit_question(&self) -> GatewayResult<Option<Message>> {
        let Some(id) = self.conversations.selection() else {
            return Ok(None);
        };
        let question = self.question();
        if question.trim().is_empty() {
            return Ok(None);
        }

        let result = self.ask(&id, &question).await;
        self.draft().clear();
        result
    }

    // ----- view ----------------------------------------------------------

    /// Notice board.
    #[must_use]
    pub const fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Read-only projection over the current state.
    #[must_use]
    pub fn view(&self) -> ViewProjection<'_> {
        ViewProjection {
            tokens: &self.tokens,
            documents: &self.documents,
            conversations: &self.conversations,
            notices: &self.notices,
            uploads_in_flight: self.uploads_in_flight.load(Ordering::SeqCst),
            question: self.question(),
        }
    }

    /// Full view snapshot evaluated now.
    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot {
        self.view().snapshot()
    }
}
