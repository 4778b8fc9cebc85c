//! Chat messages exchanged about a document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ids::QuestionId;

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Question typed by the user.
    User,
    /// Answer returned by the server.
    Bot,
}

impl MessageKind {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single transcript entry. Never edited after creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Text content.
    pub content: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Question this message belongs to.
    pub question_id: QuestionId,
}

impl Message {
    /// Build a user message.
    #[must_use]
    pub fn user(question_id: QuestionId, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::User,
            content: content.into(),
            timestamp: Utc::now(),
            question_id,
        }
    }

    /// Build a bot message answering `question_id`.
    #[must_use]
    pub fn bot(question_id: QuestionId, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Bot,
            content: content.into(),
            timestamp: Utc::now(),
            question_id,
        }
    }

    /// Whether the user wrote this message.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.kind == MessageKind::User
    }
}
