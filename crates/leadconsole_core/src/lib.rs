//! Core engine of the lead admin console.
//! Filter composition, result paging, notifications, export and command
//! orchestration live here; hosts provide the data store and push transport.

pub mod config;
pub mod console;
pub mod db;
pub mod export;
pub mod filter;
pub mod logging;
pub mod model;
pub mod notify;
pub mod query;
pub mod realtime;
pub mod store;

pub use config::{ConfigError, ConsoleConfig};
pub use console::{
    CommandKind, Console, ConsoleContext, ConsoleError, ConsoleEvent, EventOutcome, FeedHealth,
    ServiceHealth,
};
pub use export::{
    CsvRenderer, ExportArtifact, ExportError, ExportFormat, ExportPipeline, JsonRenderer,
    PdfRenderer, ResultSetRenderer, XlsxRenderer,
};
pub use filter::{
    toggle, FacetSet, FilterError, FilterPatch, FilterState, FilterStore, ScoreRange, SortOrder,
    ValidationError,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::lead::{
    FollowUpTask, LeadDetail, LeadId, LeadIntent, LeadPatch, LeadQuality, LeadRecord, LeadStatus,
};
pub use notify::{
    NotificationCategory, NotificationCenter, NotificationItem, NotificationPreferences, PushEvent,
};
pub use query::{
    MutationGateway, QueryExecutor, ResultPage, TransportError, TransportResult,
};
pub use realtime::{LocalRealtimeHub, RealtimeSource, RecordChange, RecordChangeKind};
pub use store::{SqliteLeadStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
