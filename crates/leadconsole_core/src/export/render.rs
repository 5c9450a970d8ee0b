//! Built-in result set renderers.

use crate::export::{ExportError, ExportFormat, ResultSetRenderer};
use crate::model::lead::LeadRecord;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::fmt::Display;

const CSV_HEADER: [&str; 11] = [
    "id",
    "name",
    "status",
    "lead_quality",
    "intent",
    "area",
    "tags",
    "score",
    "assigned_agent",
    "created_at",
    "updated_at",
];

/// CSV renderer with a header row and RFC 4180 style quoting.
///
/// Tags are joined with `;` inside one column.
#[derive(Debug, Clone)]
pub struct CsvRenderer {
    delimiter: u8,
}

impl CsvRenderer {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSetRenderer for CsvRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, records: &[LeadRecord]) -> Result<Vec<u8>, ExportError> {
        if !self.delimiter.is_ascii() || self.delimiter == b'"' {
            return Err(render_error(
                ExportFormat::Csv,
                format!("unsupported delimiter byte {}", self.delimiter),
            ));
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer
            .write_record(CSV_HEADER)
            .map_err(|err| render_error(ExportFormat::Csv, err))?;
        for record in records {
            writer
                .write_record(text_row(record))
                .map_err(|err| render_error(ExportFormat::Csv, err))?;
        }
        writer
            .into_inner()
            .map_err(|err| render_error(ExportFormat::Csv, err))
    }
}

/// Single-sheet workbook with a bold, frozen header row.
///
/// Score and timestamps are written as numbers so spreadsheets can sort them.
#[derive(Debug, Clone)]
pub struct XlsxRenderer {
    sheet_name: String,
}

impl XlsxRenderer {
    pub fn new() -> Self {
        Self::with_sheet_name("Leads")
    }

    pub fn with_sheet_name(name: impl Into<String>) -> Self {
        Self {
            sheet_name: name.into(),
        }
    }

    fn write_workbook(&self, records: &[LeadRecord]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(self.sheet_name.as_str())?;
        for (col, name) in (0_u16..).zip(CSV_HEADER) {
            sheet.write_string_with_format(0, col, name, &header_format)?;
        }
        sheet.set_freeze_panes(1, 0)?;

        for (row, record) in (1_u32..).zip(records) {
            let id = record.id.to_string();
            let tags = record.tags.join(";");
            sheet.write_string(row, 0, id.as_str())?;
            sheet.write_string(row, 1, record.name.as_str())?;
            sheet.write_string(row, 2, record.status.as_str())?;
            sheet.write_string(row, 3, record.lead_quality.as_str())?;
            sheet.write_string(row, 4, record.intent.as_str())?;
            sheet.write_string(row, 5, record.area.as_str())?;
            sheet.write_string(row, 6, tags.as_str())?;
            sheet.write_number(row, 7, f64::from(record.score))?;
            sheet.write_string(row, 8, record.assigned_agent.as_deref().unwrap_or_default())?;
            sheet.write_number(row, 9, record.created_at as f64)?;
            sheet.write_number(row, 10, record.updated_at as f64)?;
        }

        workbook.save_to_buffer()
    }
}

impl Default for XlsxRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSetRenderer for XlsxRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn render(&self, records: &[LeadRecord]) -> Result<Vec<u8>, ExportError> {
        self.write_workbook(records)
            .map_err(|err| render_error(ExportFormat::Xlsx, err))
    }
}

const PDF_PAGE_WIDTH_MM: f32 = 297.0;
const PDF_PAGE_HEIGHT_MM: f32 = 210.0;
const PDF_MARGIN_MM: f32 = 12.0;
const PDF_LINE_HEIGHT_MM: f32 = 5.0;
const PDF_FONT_SIZE_PT: f32 = 8.0;

/// Fixed-width columns of the PDF listing: (header, width in characters).
const PDF_COLUMNS: [(&str, usize); 8] = [
    ("name", 28),
    ("status", 12),
    ("quality", 8),
    ("intent", 8),
    ("area", 18),
    ("score", 6),
    ("agent", 18),
    ("created_at", 14),
];

/// Landscape A4 listing in a monospace built-in font.
///
/// Long values are cut to their column width; every page repeats the header.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    title: String,
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self::with_title("Leads")
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    fn rows_per_page() -> usize {
        let usable = PDF_PAGE_HEIGHT_MM - 2.0 * PDF_MARGIN_MM;
        // One line is taken by the header.
        ((usable / PDF_LINE_HEIGHT_MM) as usize).saturating_sub(1).max(1)
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSetRenderer for PdfRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, records: &[LeadRecord]) -> Result<Vec<u8>, ExportError> {
        let (doc, first_page, first_layer) = PdfDocument::new(
            self.title.clone(),
            Mm(PDF_PAGE_WIDTH_MM),
            Mm(PDF_PAGE_HEIGHT_MM),
            "rows",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Courier)
            .map_err(|err| render_error(ExportFormat::Pdf, err))?;

        let pages: Vec<&[LeadRecord]> = if records.is_empty() {
            vec![records]
        } else {
            records.chunks(Self::rows_per_page()).collect()
        };
        let header = pdf_line(PDF_COLUMNS.map(|(name, _)| name.to_string()));

        for (index, chunk) in pages.into_iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) =
                    doc.add_page(Mm(PDF_PAGE_WIDTH_MM), Mm(PDF_PAGE_HEIGHT_MM), "rows");
                doc.get_page(page).get_layer(layer)
            };

            let mut y = PDF_PAGE_HEIGHT_MM - PDF_MARGIN_MM;
            layer.use_text(header.as_str(), PDF_FONT_SIZE_PT, Mm(PDF_MARGIN_MM), Mm(y), &font);
            for record in chunk {
                y -= PDF_LINE_HEIGHT_MM;
                let line = pdf_line([
                    record.name.clone(),
                    record.status.as_str().to_string(),
                    record.lead_quality.as_str().to_string(),
                    record.intent.as_str().to_string(),
                    record.area.clone(),
                    record.score.to_string(),
                    record.assigned_agent.clone().unwrap_or_default(),
                    record.created_at.to_string(),
                ]);
                layer.use_text(line, PDF_FONT_SIZE_PT, Mm(PDF_MARGIN_MM), Mm(y), &font);
            }
        }

        doc.save_to_bytes()
            .map_err(|err| render_error(ExportFormat::Pdf, err))
    }
}

fn pdf_line(values: [String; 8]) -> String {
    let mut line = String::new();
    for (&(_, width), value) in PDF_COLUMNS.iter().zip(values) {
        let cell: String = value.chars().take(width - 1).collect();
        line.push_str(&format!("{cell:<width$}"));
    }
    line.trim_end().to_string()
}

/// One lead as the text columns of [`CSV_HEADER`].
fn text_row(record: &LeadRecord) -> [String; 11] {
    [
        record.id.to_string(),
        record.name.clone(),
        record.status.as_str().to_string(),
        record.lead_quality.as_str().to_string(),
        record.intent.as_str().to_string(),
        record.area.clone(),
        record.tags.join(";"),
        record.score.to_string(),
        record.assigned_agent.clone().unwrap_or_default(),
        record.created_at.to_string(),
        record.updated_at.to_string(),
    ]
}

fn render_error(format: ExportFormat, err: impl Display) -> ExportError {
    ExportError::Render {
        format,
        message: err.to_string(),
    }
}

/// JSON array renderer using the records' serde representation.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ResultSetRenderer for JsonRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, records: &[LeadRecord]) -> Result<Vec<u8>, ExportError> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(records)
        } else {
            serde_json::to_vec(records)
        };
        encoded.map_err(|err| render_error(ExportFormat::Json, err))
    }
}
