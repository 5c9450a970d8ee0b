//! Lead record and facet enumerations.
//!
//! # Responsibility
//! - Define the record shape returned by query executors.
//! - Provide wire-name conversions for every closed facet enumeration.
//!
//! # Invariants
//! - `score` is always within `0..=100`.
//! - `updated_at` is never earlier than `created_at` for persisted leads.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one lead record.
pub type LeadId = Uuid;

/// Upper bound for lead scores.
pub const MAX_SCORE: u8 = 100;

/// Pipeline status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadStatus {
    New,
    InProgress,
    Completed,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::New,
        LeadStatus::InProgress,
        LeadStatus::Completed,
        LeadStatus::Lost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
    }
}

/// Qualification grade assigned to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadQuality {
    Hot,
    Warm,
    Cold,
}

impl LeadQuality {
    pub const ALL: [LeadQuality; 3] = [LeadQuality::Hot, LeadQuality::Warm, LeadQuality::Cold];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str() == value.trim())
    }
}

/// What the customer wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadIntent {
    Buy,
    Rent,
    Sell,
    Invest,
}

impl LeadIntent {
    pub const ALL: [LeadIntent; 4] = [
        LeadIntent::Buy,
        LeadIntent::Rent,
        LeadIntent::Sell,
        LeadIntent::Invest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Rent => "rent",
            Self::Sell => "sell",
            Self::Invest => "invest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == value.trim())
    }
}

macro_rules! impl_display_via_as_str {
    ($($ty:ty),*) => {
        $(impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_via_as_str!(LeadStatus, LeadQuality, LeadIntent);

/// Canonical lead row as seen by the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: LeadId,
    /// Customer display name.
    pub name: String,
    pub status: LeadStatus,
    pub lead_quality: LeadQuality,
    pub intent: LeadIntent,
    /// Normalized area slug (lowercase).
    pub area: String,
    /// Normalized tags (lowercase, deduplicated, sorted).
    pub tags: Vec<String>,
    pub score: u8,
    pub assigned_agent: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl LeadRecord {
    /// Creates a fresh `new` lead with generated id and neutral defaults.
    ///
    /// Used by seeding paths; imported leads should build the struct directly.
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: LeadStatus::New,
            lead_quality: LeadQuality::Warm,
            intent: LeadIntent::Buy,
            area: String::new(),
            tags: Vec::new(),
            score: 0,
            assigned_agent: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Follow-up task scheduled against a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpTask {
    /// Short task description shown in the detail drawer.
    pub title: String,
    /// Unix epoch milliseconds.
    pub due_at: i64,
}

/// Detail summary for the selected lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetail {
    pub record: LeadRecord,
    /// Scheduled follow-ups ordered by `due_at ASC`.
    pub follow_ups: Vec<FollowUpTask>,
}

/// Partial field update for one lead.
///
/// Absent fields are left untouched by the backing store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub status: Option<LeadStatus>,
    pub lead_quality: Option<LeadQuality>,
    pub intent: Option<LeadIntent>,
    pub area: Option<String>,
    pub score: Option<u8>,
    /// `Some(None)` clears the assignment.
    pub assigned_agent: Option<Option<String>>,
}

impl LeadPatch {
    /// Returns whether this patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.lead_quality.is_none()
            && self.intent.is_none()
            && self.area.is_none()
            && self.score.is_none()
            && self.assigned_agent.is_none()
    }
}
