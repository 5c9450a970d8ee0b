#![allow(dead_code)]

use async_trait::async_trait;
use leadconsole_core::query::page_offset;
use leadconsole_core::{
    FilterState, FollowUpTask, LeadDetail, LeadId, LeadPatch, LeadQuality, LeadRecord, LeadStatus,
    MutationGateway, QueryExecutor, ResultPage, TransportError, TransportResult,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

pub fn lead(
    name: &str,
    status: LeadStatus,
    quality: LeadQuality,
    score: u8,
    created_at: i64,
) -> LeadRecord {
    let mut record = LeadRecord::new(name, created_at);
    record.status = status;
    record.lead_quality = quality;
    record.score = score;
    record
}

/// Yields to spawned tasks until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached after yielding to background tasks");
}

/// In-memory executor and gateway with call recording.
#[derive(Default)]
pub struct MemoryLeads {
    records: Mutex<Vec<LeadRecord>>,
    follow_ups: Mutex<HashMap<LeadId, Vec<FollowUpTask>>>,
    page_calls: Mutex<Vec<(FilterState, u32, u32)>>,
    fail_pages: Mutex<Option<String>>,
    fail_mutations: Mutex<Option<String>>,
}

impl MemoryLeads {
    pub fn with_records(records: Vec<LeadRecord>) -> Self {
        let leads = Self::default();
        *leads.records.lock() = records;
        leads
    }

    pub fn page_calls(&self) -> Vec<(FilterState, u32, u32)> {
        self.page_calls.lock().clone()
    }

    pub fn fail_pages(&self, reason: Option<&str>) {
        *self.fail_pages.lock() = reason.map(str::to_string);
    }

    pub fn fail_mutations(&self, reason: Option<&str>) {
        *self.fail_mutations.lock() = reason.map(str::to_string);
    }

    pub fn record(&self, id: LeadId) -> Option<LeadRecord> {
        self.records.lock().iter().find(|record| record.id == id).cloned()
    }

    pub fn remove(&self, id: LeadId) {
        self.records.lock().retain(|record| record.id != id);
    }

    fn matching(&self, filters: &FilterState) -> Vec<LeadRecord> {
        let mut matching: Vec<LeadRecord> = self
            .records
            .lock()
            .iter()
            .filter(|record| filters.status.is_empty() || filters.status.contains(&record.status))
            .filter(|record| {
                filters.lead_quality.is_empty()
                    || filters.lead_quality.contains(&record.lead_quality)
            })
            .filter(|record| filters.intent.is_empty() || filters.intent.contains(&record.intent))
            .filter(|record| filters.score_range.contains(record.score))
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(left.id.cmp(&right.id))
        });
        matching
    }
}

#[async_trait]
impl QueryExecutor for MemoryLeads {
    async fn fetch_page(
        &self,
        filters: &FilterState,
        page: u32,
        page_size: u32,
    ) -> TransportResult<ResultPage> {
        self.page_calls.lock().push((filters.clone(), page, page_size));
        if let Some(reason) = self.fail_pages.lock().clone() {
            return Err(TransportError::retryable("fetch_page", reason));
        }
        let matching = self.matching(filters);
        let offset = page_offset(page, page_size) as usize;
        Ok(ResultPage {
            total_count: matching.len() as u64,
            records: matching
                .into_iter()
                .skip(offset)
                .take(page_size as usize)
                .collect(),
        })
    }

    async fn fetch_detail(&self, id: LeadId) -> TransportResult<Option<LeadDetail>> {
        Ok(self.record(id).map(|record| LeadDetail {
            follow_ups: self.follow_ups.lock().get(&id).cloned().unwrap_or_default(),
            record,
        }))
    }
}

#[async_trait]
impl MutationGateway for MemoryLeads {
    async fn update_record(&self, id: LeadId, patch: &LeadPatch) -> TransportResult<()> {
        if let Some(reason) = self.fail_mutations.lock().clone() {
            return Err(TransportError::new("update_record", reason));
        }
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| TransportError::new("update_record", "lead not found"))?;
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(quality) = patch.lead_quality {
            record.lead_quality = quality;
        }
        if let Some(score) = patch.score {
            record.score = score;
        }
        if let Some(agent) = &patch.assigned_agent {
            record.assigned_agent = agent.clone();
        }
        Ok(())
    }

    async fn schedule_follow_up(&self, id: LeadId, task: &FollowUpTask) -> TransportResult<()> {
        if let Some(reason) = self.fail_mutations.lock().clone() {
            return Err(TransportError::new("schedule_follow_up", reason));
        }
        self.follow_ups
            .lock()
            .entry(id)
            .or_default()
            .push(task.clone());
        Ok(())
    }
}

/// Executor whose page responses are released by the test, in any order.
#[derive(Default)]
pub struct GatedExecutor {
    pending: Mutex<Vec<Option<oneshot::Sender<TransportResult<ResultPage>>>>>,
}

impl GatedExecutor {
    pub fn call_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Completes the `index`-th (0-based) page call.
    pub fn respond(&self, index: usize, page: ResultPage) {
        let sender = self.pending.lock()[index]
            .take()
            .expect("call already answered");
        sender.send(Ok(page)).expect("caller should still wait");
    }
}

#[async_trait]
impl QueryExecutor for GatedExecutor {
    async fn fetch_page(
        &self,
        _filters: &FilterState,
        _page: u32,
        _page_size: u32,
    ) -> TransportResult<ResultPage> {
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().push(Some(sender));
        receiver
            .await
            .map_err(|_| TransportError::new("fetch_page", "gate dropped"))?
    }

    async fn fetch_detail(&self, _id: LeadId) -> TransportResult<Option<LeadDetail>> {
        Ok(None)
    }
}

/// Serves pages and commands from [`MemoryLeads`] but holds every detail
/// response until the test releases it.
pub struct GatedDetails {
    pub leads: Arc<MemoryLeads>,
    pending: Mutex<Vec<Option<oneshot::Sender<TransportResult<Option<LeadDetail>>>>>>,
}

impl GatedDetails {
    pub fn new(leads: Arc<MemoryLeads>) -> Self {
        Self {
            leads,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn detail_calls(&self) -> usize {
        self.pending.lock().len()
    }

    /// Completes the `index`-th (0-based) detail call.
    pub fn respond_detail(&self, index: usize, detail: Option<LeadDetail>) {
        let sender = self.pending.lock()[index]
            .take()
            .expect("detail call already answered");
        assert!(sender.send(Ok(detail)).is_ok(), "caller should still wait");
    }
}

#[async_trait]
impl QueryExecutor for GatedDetails {
    async fn fetch_page(
        &self,
        filters: &FilterState,
        page: u32,
        page_size: u32,
    ) -> TransportResult<ResultPage> {
        self.leads.fetch_page(filters, page, page_size).await
    }

    async fn fetch_detail(&self, _id: LeadId) -> TransportResult<Option<LeadDetail>> {
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().push(Some(sender));
        receiver
            .await
            .map_err(|_| TransportError::new("fetch_detail", "gate dropped"))?
    }
}

#[async_trait]
impl MutationGateway for GatedDetails {
    async fn update_record(&self, id: LeadId, patch: &LeadPatch) -> TransportResult<()> {
        self.leads.update_record(id, patch).await
    }

    async fn schedule_follow_up(&self, id: LeadId, task: &FollowUpTask) -> TransportResult<()> {
        self.leads.schedule_follow_up(id, task).await
    }
}

pub fn page_of(records: Vec<LeadRecord>) -> ResultPage {
    ResultPage {
        total_count: records.len() as u64,
        records,
    }
}
