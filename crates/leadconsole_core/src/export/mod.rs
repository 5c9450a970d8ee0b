//! Export pipeline over the live filtered result set.
//!
//! # Responsibility
//! - Re-run the query for the filter captured at call time and collect every
//!   matching record up to a row cap.
//! - Render the collected rows through a pluggable renderer per format.
//!   CSV, XLSX, PDF and JSON renderers are registered by default; hosts may
//!   replace or unregister any of them.
//!
//! # Invariants
//! - Formats without a registered renderer fail before any query is issued.
//! - Either a complete artifact is returned or an error; partially rendered
//!   bytes are never surfaced.
//! - Artifact filenames follow `<entity>-<epoch-ms>.<ext>`.

use crate::config::ConsoleConfig;
use crate::filter::FilterState;
use crate::model::lead::LeadRecord;
use crate::model::now_epoch_ms;
use crate::query::{QueryExecutor, TransportError};
use log::{error, info};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

mod render;

pub use render::{CsvRenderer, JsonRenderer, PdfRenderer, XlsxRenderer};

/// Default maximum number of rows one export may contain.
pub const DEFAULT_EXPORT_ROW_CAP: usize = 10_000;

/// Page size used while collecting export rows.
pub const EXPORT_FETCH_PAGE_SIZE: u32 = 500;

/// Requested artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xlsx" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Export failure. No artifact bytes accompany any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// Unknown format name, or a known format without a registered renderer.
    UnsupportedFormat(String),
    /// The filtered result set is larger than the configured cap.
    RowCapExceeded { total: u64, cap: usize },
    Transport(TransportError),
    Render {
        format: ExportFormat,
        message: String,
    },
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat(format) => write!(f, "unsupported export format: `{format}`"),
            Self::RowCapExceeded { total, cap } => {
                write!(f, "export of {total} rows exceeds the cap of {cap} rows")
            }
            Self::Transport(err) => write!(f, "{err}"),
            Self::Render { format, message } => write!(f, "{format} rendering failed: {message}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for ExportError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

/// Renders one complete result set into artifact bytes.
pub trait ResultSetRenderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(&self, records: &[LeadRecord]) -> Result<Vec<u8>, ExportError>;
}

/// Finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    /// `<entity>-<epoch-ms>.<ext>`
    pub filename: String,
    pub content_type: &'static str,
    pub row_count: usize,
    pub bytes: Vec<u8>,
}

/// Builds the download filename for an export artifact.
pub fn export_filename(entity: &str, epoch_ms: i64, format: ExportFormat) -> String {
    format!("{entity}-{epoch_ms}.{}", format.extension())
}

/// Query-then-render export pipeline.
#[derive(Clone)]
pub struct ExportPipeline {
    renderers: BTreeMap<ExportFormat, Arc<dyn ResultSetRenderer>>,
    entity: String,
    row_cap: usize,
    page_size: u32,
    clock: fn() -> i64,
}

impl ExportPipeline {
    /// Creates a pipeline with every built-in renderer registered.
    pub fn new(entity: impl Into<String>, row_cap: usize, page_size: u32) -> Self {
        let mut pipeline = Self {
            renderers: BTreeMap::new(),
            entity: entity.into(),
            row_cap,
            page_size: page_size.max(1),
            clock: now_epoch_ms,
        };
        pipeline.register(Arc::new(CsvRenderer::new()));
        pipeline.register(Arc::new(XlsxRenderer::new()));
        pipeline.register(Arc::new(PdfRenderer::new()));
        pipeline.register(Arc::new(JsonRenderer::new()));
        pipeline
    }

    /// Creates a pipeline from the console configuration.
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(
            config.export_entity.clone(),
            config.export_row_cap,
            EXPORT_FETCH_PAGE_SIZE,
        )
    }

    /// Overrides the clock used for artifact filenames.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Registers (or replaces) the renderer for its format.
    pub fn register(&mut self, renderer: Arc<dyn ResultSetRenderer>) {
        self.renderers.insert(renderer.format(), renderer);
    }

    /// Removes the renderer for `format`; returns whether one was registered.
    pub fn unregister(&mut self, format: ExportFormat) -> bool {
        self.renderers.remove(&format).is_some()
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        self.renderers.contains_key(&format)
    }

    pub fn supported_formats(&self) -> Vec<ExportFormat> {
        self.renderers.keys().copied().collect()
    }

    pub fn row_cap(&self) -> usize {
        self.row_cap
    }

    /// Exports every record matching `filters`.
    ///
    /// `filters` must be the state at call time; the pipeline pages through
    /// the executor itself and ignores whatever page the console shows.
    ///
    /// # Errors
    /// - `UnsupportedFormat` when no renderer is registered for `format`.
    /// - `RowCapExceeded` when the result set is larger than the cap.
    /// - `Transport` when any page fetch fails.
    /// - `Render` when the renderer fails.
    pub async fn export_results(
        &self,
        executor: &dyn QueryExecutor,
        format: ExportFormat,
        filters: &FilterState,
    ) -> Result<ExportArtifact, ExportError> {
        let started_at = Instant::now();
        let renderer = self
            .renderers
            .get(&format)
            .cloned()
            .ok_or_else(|| ExportError::UnsupportedFormat(format.as_str().to_string()))?;

        let result = self.collect_and_render(executor, renderer.as_ref(), filters).await;
        match result {
            Ok((row_count, bytes)) => {
                info!(
                    "event=export module=export status=ok format={} rows={} bytes={} duration_ms={}",
                    format,
                    row_count,
                    bytes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(ExportArtifact {
                    format,
                    filename: export_filename(&self.entity, (self.clock)(), format),
                    content_type: format.content_type(),
                    row_count,
                    bytes,
                })
            }
            Err(err) => {
                error!(
                    "event=export module=export status=error format={} duration_ms={} error={}",
                    format,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    async fn collect_and_render(
        &self,
        executor: &dyn QueryExecutor,
        renderer: &dyn ResultSetRenderer,
        filters: &FilterState,
    ) -> Result<(usize, Vec<u8>), ExportError> {
        let mut records: Vec<LeadRecord> = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1_u32;
        let mut expected_total = 0_u64;

        loop {
            let result = executor.fetch_page(filters, page, self.page_size).await?;
            if page == 1 {
                expected_total = result.total_count;
                self.check_cap(expected_total)?;
            }

            let fetched = result.records.len();
            for record in result.records {
                if seen.insert(record.id) {
                    records.push(record);
                }
            }
            self.check_cap(records.len() as u64)?;

            let exhausted = fetched < self.page_size as usize;
            if exhausted || records.len() as u64 >= expected_total {
                break;
            }
            page += 1;
        }

        let bytes = renderer.render(&records)?;
        Ok((records.len(), bytes))
    }

    fn check_cap(&self, total: u64) -> Result<(), ExportError> {
        if total > self.row_cap as u64 {
            return Err(ExportError::RowCapExceeded {
                total,
                cap: self.row_cap,
            });
        }
        Ok(())
    }
}
