//! Request gateway: the only path from client state to the remote API.
//!
//! Every call reads the current token from the [`TokenStore`] and maps raw
//! failures into [`GatewayError`]:
//! - a 401 (or a missing token) yields `Unauthorized`; ending the session is left
//!   to the caller, which knows which session issued the request;
//! - any other status yields an operation-scoped message;
//! - transport and decode failures yield the operation's generic message.

pub mod api;
pub mod error;
pub mod http;

pub use api::{ApiFuture, AskRequest, AskResponse, CleanupReport, RemoteApi};
pub use error::{GatewayError, GatewayResult, Operation, RemoteFailure};
pub use http::HttpApi;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::document::{Document, UploadFile};
use crate::core::ids::DocumentId;
use crate::session::TokenStore;

/// Authenticated access to the remote API with the uniform failure policy.
#[derive(Clone)]
pub struct RequestGateway {
    api: Arc<dyn RemoteApi>,
    tokens: Arc<TokenStore>,
}

impl RequestGateway {
    /// Wrap `api`, authenticating with tokens from `tokens`.
    #[must_use]
    pub fn new(api: Arc<dyn RemoteApi>, tokens: Arc<TokenStore>) -> Self {
        Self { api, tokens }
    }

    fn bearer(&self) -> GatewayResult<String> {
        self.tokens.token().ok_or(GatewayError::Unauthorized)
    }

    fn settle<T>(&self, operation: Operation, result: Result<T, RemoteFailure>) -> GatewayResult<T> {
        result.map_err(|failure| {
            if failure.is_unauthorized() {
                debug!(%operation, "unauthorized response");
                return GatewayError::Unauthorized;
            }

            warn!(%operation, "remote operation failed: {failure}");
            let (message, status) = match failure {
                RemoteFailure::Status(status) => (operation.status_message(), Some(status)),
                RemoteFailure::Network(_) | RemoteFailure::Decode(_) | RemoteFailure::Request(_) => {
                    (operation.network_message(), None)
                }
            };
            GatewayError::Operation {
                operation,
                message: message.to_string(),
                status,
            }
        })
    }

    /// Fetch the caller's documents.
    ///
    /// # Errors
    /// Returns `Unauthorized` on 401, or an operation failure.
    pub async fn list_documents(&self) -> GatewayResult<Vec<Document>> {
        let token = self.bearer()?;
        let result = self.api.list_documents(&token).await;
        self.settle(Operation::ListDocuments, result)
    }

    /// Upload a file.
    ///
    /// # Errors
    /// Returns `Unauthorized` on 401, or an operation failure.
    pub async fn upload_document(&self, file: UploadFile) -> GatewayResult<Document> {
        let token = self.bearer()?;
        let result = self.api.upload_document(&token, file).await;
        self.settle(Operation::Upload, result)
    }

    /// Delete a document.
    ///
    /// # Errors
    /// Returns `Unauthorized` on 401, or an operation failure.
    pub async fn delete_document(&self, id: &DocumentId) -> GatewayResult<()> {
        let token = self.bearer()?;
        let result = self.api.delete_document(&token, id).await;
        self.settle(Operation::Delete, result)
    }

    /// Ask a question.
    ///
    /// # Errors
    /// Returns `Unauthorized` on 401, or an operation failure.
    pub async fn ask(&self, request: &AskRequest) -> GatewayResult<AskResponse> {
        let token = self.bearer()?;
        let result = self.api.ask(&token, request).await;
        self.settle(Operation::Ask, result)
    }

    /// Prune orphaned documents server-side.
    ///
    /// # Errors
    /// Returns `Unauthorized` on 401, or an operation failure.
    pub async fn cleanup_documents(&self) -> GatewayResult<CleanupReport> {
        let token = self.bearer()?;
        let result = self.api.cleanup_documents(&token).await;
        self.settle(Operation::Cleanup, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStorage;
    use crate::testing::ScriptedApi;

    fn gateway_with(api: Arc<ScriptedApi>, token: Option<&str>) -> (Arc<TokenStore>, RequestGateway) {
        let storage = match token {
            Some(token) => MemoryTokenStorage::with_token(token),
            None => MemoryTokenStorage::new(),
        };
        let tokens = Arc::new(TokenStore::new(Arc::new(storage)));
        tokens.initialize(None).unwrap();
        let gateway = RequestGateway::new(api, tokens.clone());
        (tokens, gateway)
    }

    #[tokio::test]
    async fn attaches_current_token() {
        let api = Arc::new(ScriptedApi::new());
        api.push_documents(Ok(vec![]));
        let (_, gateway) = gateway_with(api.clone(), Some("T1"));

        gateway.list_documents().await.unwrap();

        assert_eq!(api.tokens_seen(), vec!["T1".to_string()]);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized_without_a_call() {
        let api = Arc::new(ScriptedApi::new());
        let (_, gateway) = gateway_with(api.clone(), None);

        let err = gateway.list_documents().await.unwrap_err();

        assert_eq!(err, GatewayError::Unauthorized);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn unauthorized_does_not_touch_the_session() {
        let api = Arc::new(ScriptedApi::new());
        api.push_delete(Err(RemoteFailure::Status(401)));
        let (tokens, gateway) = gateway_with(api, Some("T1"));

        let err = gateway.delete_document(&DocumentId::from("d1")).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(tokens.is_authenticated());
    }

    #[tokio::test]
    async fn maps_status_and_network_failures_per_operation() {
        let api = Arc::new(ScriptedApi::new());
        api.push_upload(Err(RemoteFailure::Status(500)));
        api.push_upload(Err(RemoteFailure::Network("connection reset".into())));
        let (tokens, gateway) = gateway_with(api, Some("T1"));
        let file = UploadFile::new("a.pdf", "application/pdf", vec![]);

        let status_err = gateway.upload_document(file.clone()).await.unwrap_err();
        let network_err = gateway.upload_document(file).await.unwrap_err();

        assert_eq!(
            status_err,
            GatewayError::Operation {
                operation: Operation::Upload,
                message: "Failed to upload document".to_string(),
                status: Some(500),
            }
        );
        assert_eq!(network_err.user_message(), Some("Error uploading document"));
        assert!(tokens.is_authenticated());
    }
}
