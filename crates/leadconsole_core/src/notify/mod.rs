//! Notification ingestion pipeline.
//!
//! # Responsibility
//! - Turn realtime push events into notification items.
//! - Apply per-category preferences before anything is buffered.
//! - Keep a bounded, most-recent-first buffer with explicit dismiss.
//!
//! # Invariants
//! - Events of a disabled category are dropped with no buffering and no
//!   surfacing.
//! - Buffer length never exceeds its configured capacity.
//! - Buffer mutation and dismiss are serialized by one lock.

use crate::model::lead::LeadId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

mod buffer;
mod center;

pub use buffer::NotificationBuffer;
pub use center::{spawn_notification_pump, IngestOutcome, NotificationCenter};

/// Default number of notifications kept in the buffer.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 50;

/// Stable identifier of one notification item.
pub type NotificationId = Uuid;

/// Notification category used for preference routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    NewLead,
    StatusChange,
    Assignment,
    FollowUpDue,
    System,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 5] = [
        NotificationCategory::NewLead,
        NotificationCategory::StatusChange,
        NotificationCategory::Assignment,
        NotificationCategory::FollowUpDue,
        NotificationCategory::System,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewLead => "new-lead",
            Self::StatusChange => "status-change",
            Self::Assignment => "assignment",
            Self::FollowUpDue => "follow-up-due",
            Self::System => "system",
        }
    }
}

impl Display for NotificationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category enablement. Categories without an entry are enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    overrides: BTreeMap<NotificationCategory, bool>,
}

impl NotificationPreferences {
    /// All categories enabled.
    pub fn all_enabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, category: NotificationCategory) -> bool {
        self.overrides.get(&category).copied().unwrap_or(true)
    }

    pub fn set_enabled(&mut self, category: NotificationCategory, enabled: bool) {
        self.overrides.insert(category, enabled);
    }

    /// Builder form of [`NotificationPreferences::set_enabled`].
    pub fn with(mut self, category: NotificationCategory, enabled: bool) -> Self {
        self.set_enabled(category, enabled);
        self
    }

    pub fn enabled_categories(&self) -> Vec<NotificationCategory> {
        NotificationCategory::ALL
            .into_iter()
            .filter(|category| self.is_enabled(*category))
            .collect()
    }
}

/// Raw realtime event as delivered by the subscription feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEvent {
    pub category: NotificationCategory,
    pub summary: String,
    pub source_record_id: Option<LeadId>,
    /// Unix epoch milliseconds.
    pub occurred_at: i64,
}

impl PushEvent {
    pub fn new(
        category: NotificationCategory,
        summary: impl Into<String>,
        source_record_id: Option<LeadId>,
        occurred_at: i64,
    ) -> Self {
        Self {
            category,
            summary: summary.into(),
            source_record_id,
            occurred_at,
        }
    }
}

/// Buffered notification shown in the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: NotificationId,
    pub category: NotificationCategory,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub summary: String,
    pub source_record_id: Option<LeadId>,
}

impl NotificationItem {
    pub fn from_event(event: PushEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: event.category,
            created_at: event.occurred_at,
            summary: event.summary,
            source_record_id: event.source_record_id,
        }
    }
}
