//! Query, detail and mutation boundaries consumed by the console.
//!
//! # Responsibility
//! - Define the async contracts the backing data store must implement.
//! - Define the result page envelope and transport error.
//! - Tag dispatched page requests so stale responses can be discarded.
//!
//! # Invariants
//! - Executors order results by the requested sort and break ties by lead id
//!   ascending, so page boundaries are stable for identical requests.
//! - Result pages are never cached beyond the filter/page pair they answer.

use crate::filter::FilterState;
use crate::model::lead::{FollowUpTask, LeadDetail, LeadId, LeadPatch, LeadRecord};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sequence;

pub use sequence::{DispatchSequencer, RequestSeq};

/// Default page size used by the console.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// One page of filtered results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    /// Records in executor order.
    pub records: Vec<LeadRecord>,
    /// Number of records matching the filter across all pages.
    pub total_count: u64,
}

impl ResultPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: LeadId) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    pub fn first_id(&self) -> Option<LeadId> {
        self.records.first().map(|record| record.id)
    }
}

/// Backing-store call failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Operation that failed (`fetch_page`, `update_record`, ...).
    pub operation: &'static str,
    /// Human-readable failure reason.
    pub message: String,
    /// Whether a retry of the same call could succeed.
    pub retryable: bool,
}

impl TransportError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            retryable: true,
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)
    }
}

impl Error for TransportError {}

pub type TransportResult<T> = Result<T, TransportError>;

/// Resolves a composed filter plus page window into one result page.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Fetches page `page` (1-based) of `page_size` records.
    async fn fetch_page(
        &self,
        filters: &FilterState,
        page: u32,
        page_size: u32,
    ) -> TransportResult<ResultPage>;

    /// Fetches the detail summary for one lead, `None` when it no longer
    /// exists.
    async fn fetch_detail(&self, id: LeadId) -> TransportResult<Option<LeadDetail>>;
}

/// Write side of the backing store.
#[async_trait]
pub trait MutationGateway: Send + Sync {
    async fn update_record(&self, id: LeadId, patch: &LeadPatch) -> TransportResult<()>;

    async fn schedule_follow_up(&self, id: LeadId, task: &FollowUpTask) -> TransportResult<()>;

    /// Assigns (or with `None` unassigns) an agent.
    async fn assign_agent(&self, id: LeadId, agent: Option<&str>) -> TransportResult<()> {
        let patch = LeadPatch {
            assigned_agent: Some(agent.map(str::to_string)),
            ..LeadPatch::default()
        };
        self.update_record(id, &patch).await
    }
}

/// Translates a 1-based page into a row offset.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(page_size)
}

#[cfg(test)]
mod tests {
    use super::{page_offset, ResultPage, TransportError};
    use crate::model::lead::LeadRecord;

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(page_offset(1, 25), 0);
        assert_eq!(page_offset(3, 25), 50);
        assert_eq!(page_offset(0, 25), 0);
    }

    #[test]
    fn result_page_lookup() {
        let record = LeadRecord::new("Ada", 1);
        let page = ResultPage {
            records: vec![record.clone()],
            total_count: 1,
        };
        assert!(page.contains(record.id));
        assert_eq!(page.first_id(), Some(record.id));
        assert_eq!(ResultPage::empty().first_id(), None);
    }

    #[test]
    fn transport_error_display_names_operation() {
        let err = TransportError::retryable("fetch_page", "timeout");
        assert!(err.retryable);
        assert_eq!(err.to_string(), "fetch_page failed: timeout");
    }
}
