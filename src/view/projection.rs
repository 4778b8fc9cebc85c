//! Read-only derivation of UI-facing values from client state.

use chrono::{DateTime, Utc};

use crate::conversation::ConversationStore;
use crate::core::document::Document;
use crate::core::ids::DocumentId;
use crate::core::message::Message;
use crate::documents::DocumentRegistry;
use crate::session::TokenStore;
use crate::view::notices::{Notice, NoticeBoard};

/// One row of the document list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DocumentEntry {
    /// The document.
    pub document: Document,
    /// Badge count; zero when no transcript exists yet.
    pub message_count: usize,
    /// Whether this is the selected document.
    pub selected: bool,
    /// Whether a question about it is awaiting an answer.
    pub asking: bool,
}

/// Everything a front end needs to render one frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ViewSnapshot {
    /// Whether a token is held.
    pub authenticated: bool,
    /// Document list with badges.
    pub documents: Vec<DocumentEntry>,
    /// Selected document, if it is still registered.
    pub selected: Option<Document>,
    /// Transcript of the selected document.
    pub transcript: Vec<Message>,
    /// Whether the selected transcript is non-empty.
    pub has_messages: bool,
    /// Whether any question is awaiting an answer.
    pub is_asking: bool,
    /// Whether any upload is in flight.
    pub is_uploading: bool,
    /// Question draft.
    pub question: String,
    /// Visible notices.
    pub notices: Vec<Notice>,
}

/// Borrowed view over client state. Never mutates what it reads.
pub struct ViewProjection<'a> {
    pub(crate) tokens: &'a TokenStore,
    pub(crate) documents: &'a DocumentRegistry,
    pub(crate) conversations: &'a ConversationStore,
    pub(crate) notices: &'a NoticeBoard,
    pub(crate) uploads_in_flight: usize,
    pub(crate) question: String,
}

impl ViewProjection<'_> {
    /// Transcript of the selected document, empty when nothing is selected.
    #[must_use]
    pub fn current_transcript(&self) -> Vec<Message> {
        self.conversations
            .selection()
            .and_then(|id| self.conversations.transcript(&id))
            .unwrap_or_default()
    }

    /// Whether the selected transcript has any message.
    #[must_use]
    pub fn has_messages(&self) -> bool {
        self.conversations
            .selection()
            .is_some_and(|id| self.conversations.message_count(&id) > 0)
    }

    /// Badge count for `id`.
    #[must_use]
    pub fn message_count(&self, id: &DocumentId) -> usize {
        self.conversations.message_count(id)
    }

    /// Whether any question is awaiting an answer.
    #[must_use]
    pub fn is_asking(&self) -> bool {
        self.conversations.pending_total() > 0
    }

    /// Whether any upload is in flight.
    #[must_use]
    pub const fn is_uploading(&self) -> bool {
        self.uploads_in_flight > 0
    }

    /// Document rows in registry order.
    #[must_use]
    pub fn document_entries(&self) -> Vec<DocumentEntry> {
        let selection = self.conversations.selection();
        self.documents
            .list()
            .into_iter()
            .map(|document| DocumentEntry {
                message_count: self.conversations.message_count(&document.id),
                selected: selection.as_ref() == Some(&document.id),
                asking: self.conversations.is_pending(&document.id),
                document,
            })
            .collect()
    }

    /// Full snapshot with notices evaluated at `now`.
    #[must_use]
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> ViewSnapshot {
        let selected = self
            .conversations
            .selection()
            .and_then(|id| self.documents.get(&id));

        ViewSnapshot {
            authenticated: self.tokens.is_authenticated(),
            documents: self.document_entries(),
            selected,
            transcript: self.current_transcript(),
            has_messages: self.has_messages(),
            is_asking: self.is_asking(),
            is_uploading: self.is_uploading(),
            question: self.question.clone(),
            notices: self.notices.active_at(now),
        }
    }

    /// Snapshot evaluated now.
    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStorage;
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        tokens: TokenStore,
        documents: DocumentRegistry,
        conversations: ConversationStore,
        notices: NoticeBoard,
    }

    impl Fixture {
        fn new() -> Self {
            let tokens = TokenStore::new(Arc::new(MemoryTokenStorage::with_token("T1")));
            tokens.initialize(None).unwrap();
            let documents = DocumentRegistry::new();
            documents.replace_all(vec![
                Document::new("d1", "a.pdf", Utc::now()),
                Document::new("d2", "b.pdf", Utc::now()),
            ]);
            Self {
                tokens,
                documents,
                conversations: ConversationStore::new(),
                notices: NoticeBoard::new(Duration::from_secs(3)),
            }
        }

        fn view(&self) -> ViewProjection<'_> {
            ViewProjection {
                tokens: &self.tokens,
                documents: &self.documents,
                conversations: &self.conversations,
                notices: &self.notices,
                uploads_in_flight: 0,
                question: String::new(),
            }
        }
    }

    #[test]
    fn empty_without_selection() {
        let fixture = Fixture::new();
        let view = fixture.view();
        assert!(view.current_transcript().is_empty());
        assert!(!view.has_messages());
        assert!(!view.is_asking());
    }

    #[test]
    fn counts_do_not_create_transcripts() {
        let fixture = Fixture::new();
        let entries = fixture.view().document_entries();
        assert!(entries.iter().all(|e| e.message_count == 0 && !e.selected));
        assert!(fixture.conversations.transcript(&"d1".into()).is_none());
        assert!(fixture.conversations.transcript(&"d2".into()).is_none());
    }

    #[test]
    fn snapshot_reflects_selection_and_pending() {
        let fixture = Fixture::new();
        fixture.conversations.select(&"d2".into());
        fixture.conversations.begin_question(&"d2".into(), "q");

        let snapshot = fixture.view().snapshot();

        assert!(snapshot.authenticated);
        assert_eq!(snapshot.selected.unwrap().filename, "b.pdf");
        assert_eq!(snapshot.transcript.len(), 1);
        assert!(snapshot.has_messages);
        assert!(snapshot.is_asking);
        let d2 = &snapshot.documents[1];
        assert!(d2.selected && d2.asking);
        assert_eq!(d2.message_count, 1);
    }
}
