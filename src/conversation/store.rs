//! Per-document transcripts and the current selection.
//!
//! Each document's transcript sits behind its own map shard entry, so appends to
//! different documents never contend. Answers are appended unconditionally and
//! matched to their question through a correlation id; the optimistic user message
//! is never removed or re-inserted.

use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;
use tracing::debug;

use crate::core::ids::{DocumentId, QuestionId};
use crate::core::message::Message;

#[derive(Clone, Debug, Default)]
struct Transcript {
    messages: Vec<Message>,
    pending: Vec<QuestionId>,
}

/// A question whose user message is already in the transcript, awaiting its answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingQuestion {
    /// Correlation id shared with the eventual answer.
    pub question_id: QuestionId,
    /// Document the question was asked about.
    pub document_id: DocumentId,
}

/// Transcripts keyed by document, plus the selected document.
#[derive(Default)]
pub struct ConversationStore {
    transcripts: DashMap<DocumentId, Transcript>,
    selection: RwLock<Option<DocumentId>>,
}

impl ConversationStore {
    /// Empty store with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty transcript for `id` if none exists. Returns whether one was created.
    pub fn ensure(&self, id: &DocumentId) -> bool {
        if self.transcripts.contains_key(id) {
            return false;
        }
        let mut created = false;
        self.transcripts.entry(id.clone()).or_insert_with(|| {
            created = true;
            Transcript::default()
        });
        created
    }

    /// Select `id`, creating its transcript lazily. Returns whether a transcript was created.
    pub fn select(&self, id: &DocumentId) -> bool {
        let created = self.ensure(id);
        *self.selection.write().unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
        debug!(%id, created, "document selected");
        created
    }

    /// Currently selected document.
    #[must_use]
    pub fn selection(&self) -> Option<DocumentId> {
        self.selection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear the selection without touching transcripts.
    pub fn clear_selection(&self) {
        *self.selection.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Optimistically append a user message and register it as pending.
    pub fn begin_question(&self, id: &DocumentId, text: &str) -> PendingQuestion {
        let question_id = QuestionId::new();
        let mut transcript = self.transcripts.entry(id.clone()).or_default();
        transcript.messages.push(Message::user(question_id, text));
        transcript.pending.push(question_id);
        debug!(%id, %question_id, "question appended");

        PendingQuestion {
            question_id,
            document_id: id.clone(),
        }
    }

    /// Append the answer to `pending`.
    ///
    /// Returns `None` and drops the answer when the transcript was deleted or
    /// cleared while the question was in flight.
    pub fn complete_question(
        &self,
        pending: &PendingQuestion,
        answer: impl Into<String>,
    ) -> Option<Message> {
        let mut transcript = self.transcripts.get_mut(&pending.document_id)?;
        let position = transcript
            .pending
            .iter()
            .position(|id| *id == pending.question_id);
        let Some(position) = position else {
            debug!(id = %pending.document_id, "answer for a discarded transcript dropped");
            return None;
        };
        transcript.pending.remove(position);

        let message = Message::bot(pending.question_id, answer);
        transcript.messages.push(message.clone());
        Some(message)
    }

    /// Settle `pending` without an answer. The user message stays in the transcript.
    pub fn abandon_question(&self, pending: &PendingQuestion) {
        if let Some(mut transcript) = self.transcripts.get_mut(&pending.document_id) {
            transcript.pending.retain(|id| *id != pending.question_id);
        }
    }

    /// Copy of the transcript for `id`, or `None` if it was never created.
    #[must_use]
    pub fn transcript(&self, id: &DocumentId) -> Option<Vec<Message>> {
        self.transcripts.get(id).map(|t| t.messages.clone())
    }

    /// Number of messages for `id`; zero without creating a transcript.
    #[must_use]
    pub fn message_count(&self, id: &DocumentId) -> usize {
        self.transcripts.get(id).map_or(0, |t| t.messages.len())
    }

    /// Whether any question about `id` is awaiting an answer.
    #[must_use]
    pub fn is_pending(&self, id: &DocumentId) -> bool {
        self.transcripts
            .get(id)
            .is_some_and(|t| !t.pending.is_empty())
    }

    /// Questions awaiting an answer across all documents.
    #[must_use]
    pub fn pending_total(&self) -> usize {
        self.transcripts.iter().map(|t| t.pending.len()).sum()
    }

    /// Delete the transcript for `id` and clear the selection if it pointed there.
    pub fn forget(&self, id: &DocumentId) {
        {
            let mut selection = self.selection.write().unwrap_or_else(PoisonError::into_inner);
            if selection.as_ref() == Some(id) {
                *selection = None;
            }
        }
        self.transcripts.remove(id);
        debug!(%id, "transcript forgotten");
    }

    /// Drop every transcript and the selection.
    pub fn clear(&self) {
        self.clear_selection();
        self.transcripts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::MessageKind;

    fn id(raw: &str) -> DocumentId {
        DocumentId::from(raw)
    }

    #[test]
    fn selecting_creates_empty_transcript_once() {
        let store = ConversationStore::new();
        assert!(store.transcript(&id("d1")).is_none());

        assert!(store.select(&id("d1")));
        assert_eq!(store.transcript(&id("d1")), Some(vec![]));
        assert_eq!(store.selection(), Some(id("d1")));

        store.begin_question(&id("d1"), "q");
        assert!(!store.select(&id("d1")));
        assert_eq!(store.message_count(&id("d1")), 1);
    }

    #[test]
    fn question_then_answer_appends_in_order() {
        let store = ConversationStore::new();
        let pending = store.begin_question(&id("d1"), "What is this about?");
        assert!(store.is_pending(&id("d1")));

        let answer = store.complete_question(&pending, "It is a summary.").unwrap();
        assert_eq!(answer.question_id, pending.question_id);

        let transcript = store.transcript(&id("d1")).unwrap();
        let kinds: Vec<_> = transcript.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MessageKind::User, MessageKind::Bot]);
        assert_eq!(transcript[0].content, "What is this about?");
        assert_eq!(transcript[1].content, "It is a summary.");
        assert!(!store.is_pending(&id("d1")));
    }

    #[test]
    fn interleaved_answers_never_drop_user_messages() {
        let store = ConversationStore::new();
        let first = store.begin_question(&id("d1"), "first");
        let second = store.begin_question(&id("d1"), "second");

        store.complete_question(&second, "answer two");
        store.complete_question(&first, "answer one");

        let contents: Vec<_> = store
            .transcript(&id("d1"))
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "answer two", "answer one"]);
        assert_eq!(store.pending_total(), 0);
    }

    #[test]
    fn abandoned_question_keeps_user_message() {
        let store = ConversationStore::new();
        let pending = store.begin_question(&id("d1"), "q");
        store.abandon_question(&pending);

        assert_eq!(store.message_count(&id("d1")), 1);
        assert!(!store.is_pending(&id("d1")));
        // A late answer after abandonment is not appended.
        assert!(store.complete_question(&pending, "late").is_none());
    }

    #[test]
    fn forgetting_selected_document_clears_selection() {
        let store = ConversationStore::new();
        store.select(&id("d1"));
        store.select(&id("d2"));
        store.forget(&id("d1"));
        assert_eq!(store.selection(), Some(id("d2")));

        let pending = store.begin_question(&id("d2"), "q");
        store.forget(&id("d2"));
        assert_eq!(store.selection(), None);
        assert!(store.transcript(&id("d2")).is_none());
        assert!(store.complete_question(&pending, "a").is_none());
        assert!(store.transcript(&id("d2")).is_none());
    }

    #[test]
    fn counting_does_not_create_transcripts() {
        let store = ConversationStore::new();
        assert_eq!(store.message_count(&id("d9")), 0);
        assert!(store.transcript(&id("d9")).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let store = ConversationStore::new();
        store.select(&id("d1"));
        store.begin_question(&id("d2"), "q");
        store.clear();
        assert_eq!(store.selection(), None);
        assert!(store.transcript(&id("d1")).is_none());
        assert_eq!(store.pending_total(), 0);
    }
}
