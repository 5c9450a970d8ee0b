//! Console orchestration over filters, results, notifications and export.
//!
//! # Responsibility
//! - Own one console session: filter state, page cursor, current result
//!   page, selection, assignment drawer and notification buffer.
//! - Turn every filter or cursor change into exactly one page dispatch.
//! - Relay commands to the mutation gateway and refetch afterwards.
//!
//! # Invariants
//! - Only the latest dispatched page request can replace the result page,
//!   and only the latest detail request can replace the detail summary.
//! - A failed page load clears the result page rather than leaving rows
//!   from an older filter on screen.
//! - The selected lead is always on the current result page, or the first
//!   record when it is not, or none when the page is empty.
//! - Realtime subscriptions are acquired at most once per activation and
//!   released on deactivation or drop.
//! - Local lead data is never patched optimistically; only refetches
//!   change it.

use crate::config::{ConfigError, ConsoleConfig};
use crate::export::ExportError;
use crate::filter::FilterError;
use crate::model::lead::{LeadDetail, LeadId};
use crate::notify::{NotificationItem, NotificationPreferences};
use crate::query::{
    MutationGateway, QueryExecutor, RequestSeq, ResultPage, TransportError, TransportResult,
};
use crate::realtime::{RealtimeSource, RecordChange};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::mpsc;

mod feeds;
mod orchestrator;

pub use orchestrator::Console;

/// Collaborators and settings injected into one console.
#[derive(Clone)]
pub struct ConsoleContext {
    pub executor: Arc<dyn QueryExecutor>,
    pub mutations: Arc<dyn MutationGateway>,
    pub realtime: Arc<dyn RealtimeSource>,
    pub config: ConsoleConfig,
    pub preferences: NotificationPreferences,
    /// Receives every buffered notification (toast feed).
    pub notification_surface: Option<mpsc::UnboundedSender<NotificationItem>>,
}

impl ConsoleContext {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        mutations: Arc<dyn MutationGateway>,
        realtime: Arc<dyn RealtimeSource>,
    ) -> Self {
        Self {
            executor,
            mutations,
            realtime,
            config: ConsoleConfig::default(),
            preferences: NotificationPreferences::all_enabled(),
            notification_surface: None,
        }
    }

    /// Uses one store for both the query and mutation boundaries.
    pub fn with_store<S>(store: Arc<S>, realtime: Arc<dyn RealtimeSource>) -> Self
    where
        S: QueryExecutor + MutationGateway + 'static,
    {
        Self::new(store.clone(), store, realtime)
    }

    pub fn with_config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_preferences(mut self, preferences: NotificationPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_notification_surface(
        mut self,
        sender: mpsc::UnboundedSender<NotificationItem>,
    ) -> Self {
        self.notification_surface = Some(sender);
        self
    }
}

/// State of one realtime feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedHealth {
    /// Console not activated.
    #[default]
    Inactive,
    Live,
    /// Subscription failed or the feed reported an error.
    Unavailable(String),
}

impl FeedHealth {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Per-feed health shown as degraded-mode indicators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceHealth {
    pub records: FeedHealth,
    pub notifications: FeedHealth,
}

impl ServiceHealth {
    /// Whether any feed is unavailable while the console keeps querying.
    pub fn is_degraded(&self) -> bool {
        self.records.is_unavailable() || self.notifications.is_unavailable()
    }
}

/// Fire-and-forget command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AssignAgent,
    ScheduleFollowUp,
    UpdateField,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssignAgent => "assign_agent",
            Self::ScheduleFollowUp => "schedule_follow_up",
            Self::UpdateField => "update_field",
        }
    }
}

impl Display for CommandKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completed background work reported back to the console.
#[derive(Debug)]
pub enum ConsoleEvent {
    PageLoaded {
        seq: RequestSeq,
        result: TransportResult<ResultPage>,
    },
    /// `seq` comes from the detail sequencer, separate from page numbering.
    DetailLoaded {
        seq: RequestSeq,
        id: LeadId,
        result: TransportResult<Option<LeadDetail>>,
    },
    RecordChanged(RecordChange),
    RecordFeedFailed(TransportError),
    CommandFinished {
        command: CommandKind,
        id: LeadId,
        result: TransportResult<()>,
    },
}

/// Whether `Console::handle_event` applied an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    /// Superseded response, ignored on arrival.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    Config(ConfigError),
    Filter(FilterError),
    Export(ExportError),
    /// Console operations spawn background work and need a tokio runtime.
    NoRuntime,
    /// Selection target is not on the current result page.
    NotOnPage(LeadId),
    /// Field update without any field.
    EmptyPatch,
}

impl Display for ConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Filter(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
            Self::NoRuntime => write!(f, "console requires a running tokio runtime"),
            Self::NotOnPage(id) => write!(f, "lead {id} is not on the current result page"),
            Self::EmptyPatch => write!(f, "field update carries no field"),
        }
    }
}

impl Error for ConsoleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Filter(err) => Some(err),
            Self::Export(err) => Some(err),
            Self::NoRuntime | Self::NotOnPage(_) | Self::EmptyPatch => None,
        }
    }
}

impl From<ConfigError> for ConsoleError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<FilterError> for ConsoleError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}

impl From<ExportError> for ConsoleError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}
