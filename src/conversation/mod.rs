//! Conversation state: transcripts per document and the current selection.

pub mod store;

pub use store::{ConversationStore, PendingQuestion};
