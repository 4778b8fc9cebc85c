//! In-memory remote API for unit tests.
//!
//! Replies are queued per operation and consumed in call order. A gated reply
//! stays pending until the test sends its result, which lets tests control the
//! completion order of overlapping requests.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::core::document::{Document, UploadFile};
use crate::core::ids::DocumentId;
use crate::gateway::{ApiFuture, AskRequest, AskResponse, CleanupReport, RemoteApi, RemoteFailure};

type Reply<T> = Result<T, RemoteFailure>;

enum Scripted<T> {
    Ready(Reply<T>),
    Gated(oneshot::Receiver<Reply<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Reply<T> {
        match self {
            Self::Ready(reply) => reply,
            Self::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(RemoteFailure::Network("gate dropped".to_string()))),
        }
    }
}

struct Queue<T>(Mutex<VecDeque<Scripted<T>>>);

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self(Mutex::new(VecDeque::new()))
    }
}

impl<T> Queue<T> {
    fn push(&self, reply: Reply<T>) {
        self.0.lock().unwrap().push_back(Scripted::Ready(reply));
    }

    fn gate(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.0.lock().unwrap().push_back(Scripted::Gated(rx));
        tx
    }

    fn next(&self) -> Scripted<T> {
        self.0.lock().unwrap().pop_front().unwrap_or_else(|| {
            Scripted::Ready(Err(RemoteFailure::Network("no scripted reply".to_string())))
        })
    }
}

#[derive(Default)]
pub struct ScriptedApi {
    documents: Queue<Vec<Document>>,
    uploads: Queue<Document>,
    deletes: Queue<()>,
    asks: Queue<AskResponse>,
    cleanups: Queue<CleanupReport>,
    tokens_seen: Mutex<Vec<String>>,
    questions: Mutex<Vec<AskRequest>>,
    uploaded: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_documents(&self, reply: Reply<Vec<Document>>) {
        self.documents.push(reply);
    }

    pub fn push_upload(&self, reply: Reply<Document>) {
        self.uploads.push(reply);
    }

    pub fn gate_upload(&self) -> oneshot::Sender<Reply<Document>> {
        self.uploads.gate()
    }

    pub fn push_delete(&self, reply: Reply<()>) {
        self.deletes.push(reply);
    }

    pub fn push_ask(&self, reply: Reply<AskResponse>) {
        self.asks.push(reply);
    }

    pub fn gate_ask(&self) -> oneshot::Sender<Reply<AskResponse>> {
        self.asks.gate()
    }

    pub fn push_cleanup(&self, reply: Reply<CleanupReport>) {
        self.cleanups.push(reply);
    }

    pub fn call_count(&self) -> usize {
        self.tokens_seen.lock().unwrap().len()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    pub fn questions(&self) -> Vec<AskRequest> {
        self.questions.lock().unwrap().clone()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    fn record(&self, token: &str) {
        self.tokens_seen.lock().unwrap().push(token.to_string());
    }
}

pub fn answer(text: &str) -> Reply<AskResponse> {
    Ok(AskResponse {
        answer: text.to_string(),
    })
}

impl RemoteApi for ScriptedApi {
    fn list_documents<'a>(&'a self, token: &'a str) -> ApiFuture<'a, Vec<Document>> {
        self.record(token);
        let scripted = self.documents.next();
        Box::pin(scripted.resolve())
    }

    fn upload_document<'a>(&'a self, token: &'a str, file: UploadFile) -> ApiFuture<'a, Document> {
        self.record(token);
        self.uploaded.lock().unwrap().push(file.filename);
        let scripted = self.uploads.next();
        Box::pin(scripted.resolve())
    }

    fn delete_document<'a>(&'a self, token: &'a str, _id: &'a DocumentId) -> ApiFuture<'a, ()> {
        self.record(token);
        let scripted = self.deletes.next();
        Box::pin(scripted.resolve())
    }

    fn ask<'a>(&'a self, token: &'a str, request: &'a AskRequest) -> ApiFuture<'a, AskResponse> {
        self.record(token);
        self.questions.lock().unwrap().push(request.clone());
        let scripted = self.asks.next();
        Box::pin(scripted.resolve())
    }

    fn cleanup_documents<'a>(&'a self, token: &'a str) -> ApiFuture<'a, CleanupReport> {
        self.record(token);
        let scripted = self.cleanups.next();
        Box::pin(scripted.resolve())
    }
}
