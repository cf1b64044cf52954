//! Report documents and their PDF / spreadsheet renderings.
//!
//! Every export builds one [`ReportDocument`] (title, summary block, a table
//! and totals) and hands it to [`render`]; the backends in [`pdf`] and
//! [`xlsx`] only know about that model.

pub mod pdf;
pub mod xlsx;

use crate::errors::ServiceError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, str::FromStr};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Output encodings for exported documents
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Excel,
}

impl ExportFormat {
    /// Parses the `format` query value; absent or blank means PDF.
    pub fn from_query(raw: Option<&str>) -> Result<Self, ServiceError> {
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(ExportFormat::Pdf),
            Some(value) => value.parse().map_err(|_| {
                ServiceError::BadRequest(format!(
                    "Unsupported format '{}'. Expected one of: pdf, excel, xlsx",
                    value
                ))
            }),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => PDF_CONTENT_TYPE,
            ExportFormat::Excel => XLSX_CONTENT_TYPE,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => write!(f, "pdf"),
            ExportFormat::Excel => write!(f, "excel"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(format!("unsupported export format: {}", other)),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Clone, Debug)]
pub struct ReportColumn {
    pub header: String,
    pub align: Align,
}

impl ReportColumn {
    pub fn text(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align: Align::Left,
        }
    }

    /// Right-aligned column; spreadsheet cells are written as numbers when they parse.
    pub fn numeric(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align: Align::Right,
        }
    }
}

/// Renderer-independent description of an exported document
#[derive(Clone, Debug)]
pub struct ReportDocument {
    pub title: String,
    pub subtitle: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// Label/value pairs printed above the table
    pub summary: Vec<(String, String)>,
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<Vec<String>>,
    /// Label/value pairs printed below the table
    pub totals: Vec<(String, String)>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>, columns: Vec<ReportColumn>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            generated_at: Utc::now(),
            summary: Vec::new(),
            columns,
            rows: Vec::new(),
            totals: Vec::new(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn summary_line(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.summary.push((label.into(), value.into()));
        self
    }

    pub fn total_line(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.totals.push((label.into(), value.into()));
        self
    }

    /// Appends a row, padding or truncating it to the column count
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }
}

/// A rendered document ready to be sent as a download
#[derive(Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// `<entity>-<YYYYMMDD-HHMMSS>.<ext>`
pub fn export_filename(stem: &str, at: DateTime<Utc>, format: ExportFormat) -> String {
    format!(
        "{}-{}.{}",
        stem,
        at.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Renders `doc` in the requested format
pub fn render(doc: &ReportDocument, format: ExportFormat) -> Result<Vec<u8>, ServiceError> {
    if doc.columns.is_empty() {
        return Err(ServiceError::ExportError(
            "report has no columns".to_string(),
        ));
    }
    match format {
        ExportFormat::Pdf => pdf::render_pdf(doc),
        ExportFormat::Excel => xlsx::render_xlsx(doc),
    }
}

/// Renders on the blocking pool; document generation is CPU-bound.
pub async fn render_report(
    doc: ReportDocument,
    format: ExportFormat,
    stem: &str,
) -> Result<RenderedReport, ServiceError> {
    let filename = export_filename(stem, doc.generated_at, format);
    let bytes = tokio::task::spawn_blocking(move || render(&doc, format)).await??;
    Ok(RenderedReport {
        bytes,
        content_type: format.content_type(),
        filename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    pub(crate) fn sample_document() -> ReportDocument {
        let mut doc = ReportDocument::new(
            "Customers",
            vec![
                ReportColumn::text("Business"),
                ReportColumn::text("Type"),
                ReportColumn::numeric("Orders"),
            ],
        )
        .subtitle("Beverage Distribution Co.")
        .summary_line("Filter", "City: Lisbon")
        .total_line("Customers", "2");
        doc.push_row(vec!["Café Central".into(), "Café".into(), "3".into()]);
        doc.push_row(vec!["Harbor Bar".into(), "Bar / Pub".into()]);
        doc
    }

    #[rstest]
    #[case(None, ExportFormat::Pdf)]
    #[case(Some(""), ExportFormat::Pdf)]
    #[case(Some("pdf"), ExportFormat::Pdf)]
    #[case(Some("PDF"), ExportFormat::Pdf)]
    #[case(Some("excel"), ExportFormat::Excel)]
    #[case(Some("xlsx"), ExportFormat::Excel)]
    fn format_query_values(#[case] raw: Option<&str>, #[case] expected: ExportFormat) {
        assert_eq!(ExportFormat::from_query(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_format_is_a_bad_request() {
        let err = ExportFormat::from_query(Some("csv")).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn filename_carries_timestamp_and_extension() {
        let at = Utc.with_ymd_and_hms(2024, 5, 7, 9, 3, 1).unwrap();
        assert_eq!(
            export_filename("orders", at, ExportFormat::Excel),
            "orders-20240507-090301.xlsx"
        );
        assert_eq!(
            export_filename("order-REQ-1", at, ExportFormat::Pdf),
            "order-REQ-1-20240507-090301.pdf"
        );
    }

    #[test]
    fn rows_are_padded_to_column_count() {
        let doc = sample_document();
        assert_eq!(doc.rows[1], vec!["Harbor Bar", "Bar / Pub", ""]);
    }

    #[test]
    fn renders_both_formats_with_their_magic_bytes() {
        let doc = sample_document();
        let pdf = render(&doc, ExportFormat::Pdf).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        let xlsx = render(&doc, ExportFormat::Excel).unwrap();
        assert!(xlsx.starts_with(b"PK"));
    }

    #[test]
    fn empty_table_still_renders() {
        let doc = ReportDocument::new("Products", vec![ReportColumn::text("Name")]);
        assert!(render(&doc, ExportFormat::Pdf).unwrap().starts_with(b"%PDF"));
        assert!(render(&doc, ExportFormat::Excel).unwrap().starts_with(b"PK"));
    }

    #[tokio::test]
    async fn render_report_runs_off_the_async_runtime() {
        let rendered = render_report(sample_document(), ExportFormat::Excel, "customers")
            .await
            .unwrap();
        assert_eq!(rendered.content_type, XLSX_CONTENT_TYPE);
        assert!(rendered.filename.starts_with("customers-"));
        assert!(rendered.filename.ends_with(".xlsx"));
    }
}
