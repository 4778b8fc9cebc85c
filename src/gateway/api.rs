//! Remote API seam and wire types.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::core::document::{Document, UploadFile};
use crate::core::ids::DocumentId;
use crate::gateway::error::RemoteFailure;

/// Boxed future type for remote API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteFailure>> + Send + 'a>>;

/// Body of `POST /ask/`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    /// Document the question is about.
    pub document_id: DocumentId,
    /// Question text, sent as typed.
    pub question: String,
}

/// Response of `POST /ask/`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    /// Answer text.
    pub answer: String,
}

/// Response of `DELETE /documents/cleanup/`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Server summary, e.g. "Deleted 2 orphaned documents."
    pub detail: String,
}

/// Raw remote API. Implementations attach `token` as a bearer credential and
/// report failures without interpreting them.
pub trait RemoteApi: Send + Sync {
    /// List the caller's documents.
    ///
    /// # Errors
    /// Returns a failure on error status, transport error or undecodable body.
    fn list_documents<'a>(&'a self, token: &'a str) -> ApiFuture<'a, Vec<Document>>;

    /// Upload a file.
    ///
    /// # Errors
    /// Returns a failure on error status, transport error or undecodable body.
    fn upload_document<'a>(&'a self, token: &'a str, file: UploadFile) -> ApiFuture<'a, Document>;

    /// Delete a document.
    ///
    /// # Errors
    /// Returns a failure on error status or transport error.
    fn delete_document<'a>(&'a self, token: &'a str, id: &'a DocumentId) -> ApiFuture<'a, ()>;

    /// Ask a question about a document.
    ///
    /// # Errors
    /// Returns a failure on error status, transport error or undecodable body.
    fn ask<'a>(&'a self, token: &'a str, request: &'a AskRequest) -> ApiFuture<'a, AskResponse>;

    /// Prune documents whose stored file no longer exists.
    ///
    /// # Errors
    /// Returns a failure on error status, transport error or undecodable body.
    fn cleanup_documents<'a>(&'a self, token: &'a str) -> ApiFuture<'a, CleanupReport>;
}
