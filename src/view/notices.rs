//! Transient user-visible notices.
//!
//! One error slot and one success slot. Errors stay until dismissed or replaced;
//! successes expire after a configured lifetime.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::NoticeId;

/// Notice severity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Something failed.
    Error,
    /// Something completed.
    Success,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Success => f.write_str("success"),
        }
    }
}

/// A single notice.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    /// Identifier used for manual dismissal.
    pub id: NoticeId,
    /// Severity.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub text: String,
    /// When it was raised.
    pub created_at: DateTime<Utc>,
    /// When it auto-dismisses, if ever.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Notice {
    /// Whether the notice is still visible at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| now < expires)
    }
}

#[derive(Default)]
struct Slots {
    error: Option<Notice>,
    success: Option<Notice>,
}

/// Holder of the current error and success notices.
pub struct NoticeBoard {
    success_ttl: Duration,
    slots: Mutex<Slots>,
}

impl NoticeBoard {
    /// Board whose success notices live for `success_ttl`.
    #[must_use]
    pub fn new(success_ttl: Duration) -> Self {
        Self {
            success_ttl,
            slots: Mutex::new(Slots::default()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise an error, replacing any previous one.
    pub fn error(&self, text: impl Into<String>) -> Notice {
        let notice = Notice {
            id: NoticeId::new(),
            kind: NoticeKind::Error,
            text: text.into(),
            created_at: Utc::now(),
            expires_at: None,
        };
        tracing::debug!(text = %notice.text, "error notice raised");
        self.slots().error = Some(notice.clone());
        notice
    }

    /// Raise a success notice that expires after the configured lifetime.
    pub fn success(&self, text: impl Into<String>) -> Notice {
        let created_at = Utc::now();
        let expires_at = TimeDelta::from_std(self.success_ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl));
        let notice = Notice {
            id: NoticeId::new(),
            kind: NoticeKind::Success,
            text: text.into(),
            created_at,
            expires_at,
        };
        self.slots().success = Some(notice.clone());
        notice
    }

    /// Clear the error slot.
    pub fn clear_error(&self) {
        self.slots().error = None;
    }

    /// Clear both slots.
    pub fn clear(&self) {
        *self.slots() = Slots::default();
    }

    /// Dismiss a notice by id. Returns whether it was present.
    pub fn dismiss(&self, id: NoticeId) -> bool {
        let mut slots = self.slots();
        if slots.error.as_ref().is_some_and(|n| n.id == id) {
            slots.error = None;
            return true;
        }
        if slots.success.as_ref().is_some_and(|n| n.id == id) {
            slots.success = None;
            return true;
        }
        false
    }

    /// Notices visible at `now`, error first.
    #[must_use]
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notice> {
        let slots = self.slots();
        [slots.error.as_ref(), slots.success.as_ref()]
            .into_iter()
            .flatten()
            .filter(|notice| notice.is_active_at(now))
            .cloned()
            .collect()
    }

    /// Notices visible now.
    #[must_use]
    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Utc::now())
    }

    /// Current error text, if any.
    #[must_use]
    pub fn current_error(&self) -> Option<String> {
        self.slots().error.as_ref().map(|n| n.text.clone())
    }
}
