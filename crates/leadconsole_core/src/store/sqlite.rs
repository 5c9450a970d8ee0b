//! SQLite implementation of the lead query and mutation boundaries.

use crate::db::{open_db, open_db_in_memory};
use crate::filter::facet::normalize_term;
use crate::filter::{FilterState, SortOrder};
use crate::model::lead::{
    FollowUpTask, LeadDetail, LeadId, LeadIntent, LeadPatch, LeadQuality, LeadRecord, LeadStatus,
    MAX_SCORE,
};
use crate::model::now_epoch_ms;
use crate::query::{
    page_offset, MutationGateway, QueryExecutor, ResultPage, TransportError, TransportResult,
};
use crate::store::{StoreError, StoreResult};
use async_trait::async_trait;
use log::{debug, error};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

const LEAD_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    status,
    lead_quality,
    intent,
    area,
    score,
    assigned_agent,
    created_at,
    updated_at
FROM leads";

/// Lead store over one serialized SQLite connection.
pub struct SqliteLeadStore {
    conn: Mutex<Connection>,
    clock: fn() -> i64,
}

impl SqliteLeadStore {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock: now_epoch_ms,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Overrides the clock stamped into `updated_at` and follow-up rows.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Inserts one lead with its tags.
    ///
    /// Area and tags are normalized the same way facet terms are, so stored
    /// values match what the filter sends.
    pub fn insert_lead(&self, record: &LeadRecord) -> StoreResult<LeadId> {
        if record.score > MAX_SCORE {
            return Err(StoreError::Validation(format!(
                "score {} exceeds {MAX_SCORE}",
                record.score
            )));
        }
        if record.name.trim().is_empty() {
            return Err(StoreError::Validation("name cannot be blank".to_string()));
        }

        let area = normalize_term(&record.area).unwrap_or_default();
        let tags = normalized_tags(&record.tags);

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO leads (
                uuid,
                name,
                status,
                lead_quality,
                intent,
                area,
                score,
                assigned_agent,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                record.id.to_string(),
                record.name.as_str(),
                record.status.as_str(),
                record.lead_quality.as_str(),
                record.intent.as_str(),
                area,
                i64::from(record.score),
                record.assigned_agent.as_deref(),
                record.created_at,
                record.updated_at,
            ],
        )?;
        for tag in &tags {
            tx.execute(
                "INSERT INTO lead_tags (lead_uuid, tag) VALUES (?1, ?2);",
                params![record.id.to_string(), tag],
            )?;
        }
        tx.commit()?;

        Ok(record.id)
    }

    pub fn get_lead(&self, id: LeadId) -> StoreResult<Option<LeadRecord>> {
        let conn = self.conn.lock();
        load_lead(&conn, id)
    }

    /// Deletes one lead; returns whether a row existed.
    pub fn delete_lead(&self, id: LeadId) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM leads WHERE uuid = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    /// Runs the composed filter and returns one page plus the total count.
    pub fn query_page(
        &self,
        filters: &FilterState,
        page: u32,
        page_size: u32,
    ) -> StoreResult<ResultPage> {
        let started_at = Instant::now();
        let (where_sql, bind_values) = build_where_clause(filters);
        let conn = self.conn.lock();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM leads{where_sql};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let mut sql = format!("{LEAD_SELECT_SQL}{where_sql}");
        sql.push_str(order_by_clause(filters.sort));
        sql.push_str(" LIMIT ? OFFSET ?;");
        let mut page_values = bind_values;
        page_values.push(Value::Integer(i64::from(page_size)));
        page_values.push(Value::Integer(
            i64::try_from(page_offset(page, page_size)).unwrap_or(i64::MAX),
        ));

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(page_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_lead_row(row)?);
        }
        drop(rows);
        for record in &mut records {
            record.tags = load_tags(&conn, record.id)?;
        }

        debug!(
            "event=lead_query module=store status=ok page={} page_size={} rows={} total={} duration_ms={}",
            page,
            page_size,
            records.len(),
            total,
            started_at.elapsed().as_millis()
        );

        Ok(ResultPage {
            records,
            total_count: u64::try_from(total).unwrap_or(0),
        })
    }

    /// Loads one lead with its follow-ups ordered by due time.
    pub fn lead_detail(&self, id: LeadId) -> StoreResult<Option<LeadDetail>> {
        let conn = self.conn.lock();
        let Some(record) = load_lead(&conn, id)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT title, due_at
             FROM follow_ups
             WHERE lead_uuid = ?1
             ORDER BY due_at ASC, id ASC;",
        )?;
        let follow_ups = stmt
            .query_map([id.to_string()], |row| {
                Ok(FollowUpTask {
                    title: row.get(0)?,
                    due_at: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(LeadDetail { record, follow_ups }))
    }

    /// Applies the present fields of `patch` and bumps `updated_at`.
    pub fn apply_patch(&self, id: LeadId, patch: &LeadPatch) -> StoreResult<()> {
        if let Some(score) = patch.score {
            if score > MAX_SCORE {
                return Err(StoreError::Validation(format!(
                    "score {score} exceeds {MAX_SCORE}"
                )));
            }
        }

        let mut assignments = vec!["updated_at = ?".to_string()];
        let mut bind_values = vec![Value::Integer((self.clock)())];
        if let Some(status) = patch.status {
            assignments.push("status = ?".to_string());
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(quality) = patch.lead_quality {
            assignments.push("lead_quality = ?".to_string());
            bind_values.push(Value::Text(quality.as_str().to_string()));
        }
        if let Some(intent) = patch.intent {
            assignments.push("intent = ?".to_string());
            bind_values.push(Value::Text(intent.as_str().to_string()));
        }
        if let Some(area) = &patch.area {
            assignments.push("area = ?".to_string());
            bind_values.push(Value::Text(normalize_term(area).unwrap_or_default()));
        }
        if let Some(score) = patch.score {
            assignments.push("score = ?".to_string());
            bind_values.push(Value::Integer(i64::from(score)));
        }
        if let Some(agent) = &patch.assigned_agent {
            assignments.push("assigned_agent = ?".to_string());
            bind_values.push(match agent {
                Some(agent) => Value::Text(agent.clone()),
                None => Value::Null,
            });
        }
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE leads SET {} WHERE uuid = ?;", assignments.join(", "));
        let conn = self.conn.lock();
        let changed = conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub fn add_follow_up(&self, id: LeadId, task: &FollowUpTask) -> StoreResult<()> {
        if task.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "follow-up title cannot be blank".to_string(),
            ));
        }

        let now = (self.clock)();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE leads SET updated_at = ?1 WHERE uuid = ?2;",
            params![now, id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tx.execute(
            "INSERT INTO follow_ups (lead_uuid, title, due_at, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), task.title.as_str(), task.due_at, now],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for SqliteLeadStore {
    async fn fetch_page(
        &self,
        filters: &FilterState,
        page: u32,
        page_size: u32,
    ) -> TransportResult<ResultPage> {
        self.query_page(filters, page, page_size)
            .map_err(|err| boundary_error("fetch_page", err))
    }

    async fn fetch_detail(&self, id: LeadId) -> TransportResult<Option<LeadDetail>> {
        self.lead_detail(id)
            .map_err(|err| boundary_error("fetch_detail", err))
    }
}

#[async_trait]
impl MutationGateway for SqliteLeadStore {
    async fn update_record(&self, id: LeadId, patch: &LeadPatch) -> TransportResult<()> {
        self.apply_patch(id, patch)
            .map_err(|err| boundary_error("update_record", err))
    }

    async fn schedule_follow_up(&self, id: LeadId, task: &FollowUpTask) -> TransportResult<()> {
        self.add_follow_up(id, task)
            .map_err(|err| boundary_error("schedule_follow_up", err))
    }
}

fn boundary_error(operation: &'static str, err: StoreError) -> TransportError {
    error!(
        "event=store_call module=store status=error operation={} error={}",
        operation, err
    );
    err.into_transport(operation)
}

fn build_where_clause(filters: &FilterState) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut bind_values: Vec<Value> = Vec::new();

    push_in_clause(
        &mut clauses,
        &mut bind_values,
        "status",
        filters.status.iter().map(|status| status.as_str().to_string()),
    );
    push_in_clause(
        &mut clauses,
        &mut bind_values,
        "lead_quality",
        filters
            .lead_quality
            .iter()
            .map(|quality| quality.as_str().to_string()),
    );
    push_in_clause(
        &mut clauses,
        &mut bind_values,
        "intent",
        filters.intent.iter().map(|intent| intent.as_str().to_string()),
    );
    push_in_clause(
        &mut clauses,
        &mut bind_values,
        "area",
        filters.area.iter().cloned(),
    );

    if !filters.tag.is_empty() {
        let placeholders = vec!["?"; filters.tag.len()].join(", ");
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM lead_tags \
             WHERE lead_tags.lead_uuid = leads.uuid AND lead_tags.tag IN ({placeholders}))"
        ));
        bind_values.extend(filters.tag.iter().cloned().map(Value::Text));
    }

    if !filters.score_range.is_full() {
        clauses.push("score BETWEEN ? AND ?".to_string());
        bind_values.push(Value::Integer(i64::from(filters.score_range.low())));
        bind_values.push(Value::Integer(i64::from(filters.score_range.high())));
    }

    let match_expr = filters
        .normalized_query()
        .and_then(|text| build_match_expression(&text));
    if let Some(match_expr) = match_expr {
        clauses.push(
            "uuid IN (SELECT lead_uuid FROM leads_fts WHERE leads_fts MATCH ?)".to_string(),
        );
        bind_values.push(Value::Text(match_expr));
    }

    if clauses.is_empty() {
        return (String::new(), bind_values);
    }
    (format!(" WHERE {}", clauses.join(" AND ")), bind_values)
}

fn push_in_clause(
    clauses: &mut Vec<String>,
    bind_values: &mut Vec<Value>,
    column: &str,
    values: impl Iterator<Item = String>,
) {
    let values: Vec<Value> = values.map(Value::Text).collect();
    if values.is_empty() {
        return;
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    clauses.push(format!("{column} IN ({placeholders})"));
    bind_values.extend(values);
}

fn order_by_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Recent => " ORDER BY created_at DESC, uuid ASC",
        SortOrder::Oldest => " ORDER BY created_at ASC, uuid ASC",
        SortOrder::ScoreHigh => " ORDER BY score DESC, uuid ASC",
        SortOrder::ScoreLow => " ORDER BY score ASC, uuid ASC",
        SortOrder::Name => " ORDER BY name COLLATE NOCASE ASC, uuid ASC",
    }
}

/// Quotes every whitespace-separated term and requires all of them.
fn build_match_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn normalized_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = tags.iter().filter_map(|tag| normalize_term(tag)).collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

fn load_lead(conn: &Connection, id: LeadId) -> StoreResult<Option<LeadRecord>> {
    let record = conn
        .query_row(
            &format!("{LEAD_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
            |row| Ok(parse_lead_row(row)),
        )
        .optional()?
        .transpose()?;

    match record {
        Some(mut record) => {
            record.tags = load_tags(conn, record.id)?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

fn load_tags(conn: &Connection, id: LeadId) -> StoreResult<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT tag FROM lead_tags WHERE lead_uuid = ?1 ORDER BY tag ASC;")?;
    let tags = stmt
        .query_map([id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn parse_lead_row(row: &Row<'_>) -> StoreResult<LeadRecord> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{uuid_text}` in leads.uuid"))
    })?;

    let status_text: String = row.get("status")?;
    let status = LeadStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid status `{status_text}` in leads.status"))
    })?;

    let quality_text: String = row.get("lead_quality")?;
    let lead_quality = LeadQuality::parse(&quality_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid lead quality `{quality_text}` in leads.lead_quality"
        ))
    })?;

    let intent_text: String = row.get("intent")?;
    let intent = LeadIntent::parse(&intent_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid intent `{intent_text}` in leads.intent"))
    })?;

    let raw_score: i64 = row.get("score")?;
    let score = u8::try_from(raw_score)
        .ok()
        .filter(|score| *score <= MAX_SCORE)
        .ok_or_else(|| {
            StoreError::InvalidData(format!("invalid score `{raw_score}` in leads.score"))
        })?;

    Ok(LeadRecord {
        id,
        name: row.get("name")?,
        status,
        lead_quality,
        intent,
        area: row.get("area")?,
        tags: Vec::new(),
        score,
        assigned_agent: row.get("assigned_agent")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
