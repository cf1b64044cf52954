use super::{Align, ReportDocument};
use crate::errors::ServiceError;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};

const MAX_SHEET_NAME: usize = 31;
const MAX_COLUMN_WIDTH: usize = 60;

impl From<XlsxError> for ServiceError {
    fn from(err: XlsxError) -> Self {
        ServiceError::ExportError(format!("spreadsheet rendering failed: {}", err))
    }
}

/// Worksheet names may not contain `[]:*?/\` and are limited to 31 characters.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

fn column_width(doc: &ReportDocument, index: usize) -> f64 {
    let widest = doc
        .rows
        .iter()
        .filter_map(|row| row.get(index))
        .map(|cell| cell.chars().count())
        .chain(std::iter::once(doc.columns[index].header.chars().count()))
        .max()
        .unwrap_or(8);
    (widest.clamp(8, MAX_COLUMN_WIDTH) + 2) as f64
}

/// Renders the document as a single-sheet workbook.
pub fn render_xlsx(doc: &ReportDocument) -> Result<Vec<u8>, ServiceError> {
    let mut workbook = Workbook::new();
    let title_format = Format::new().set_bold().set_font_size(14);
    let bold = Format::new().set_bold();
    let header_format = Format::new()
        .set_bold()
        .set_background_color(0xD9E1F2)
        .set_border_bottom(rust_xlsxwriter::FormatBorder::Thin);
    let right = Format::new().set_align(FormatAlign::Right);

    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(&doc.title))?;

    let mut row: u32 = 0;
    sheet.write_string_with_format(row, 0, &doc.title, &title_format)?;
    row += 1;
    if let Some(subtitle) = &doc.subtitle {
        sheet.write_string(row, 0, subtitle)?;
        row += 1;
    }
    sheet.write_string(
        row,
        0,
        format!("Generated {}", doc.generated_at.format("%Y-%m-%d %H:%M UTC")),
    )?;
    row += 2;

    for (label, value) in &doc.summary {
        sheet.write_string_with_format(row, 0, label, &bold)?;
        sheet.write_string(row, 1, value)?;
        row += 1;
    }
    if !doc.summary.is_empty() {
        row += 1;
    }

    let header_row = row;
    for (col, column) in doc.columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(header_row, col, &column.header, &header_format)?;
    }
    row += 1;

    for cells in &doc.rows {
        for (col, (cell, column)) in cells.iter().zip(&doc.columns).enumerate() {
            let col = col as u16;
            match (column.align, cell.parse::<f64>()) {
                (Align::Right, Ok(number)) => {
                    sheet.write_number(row, col, number)?;
                }
                (Align::Right, Err(_)) => {
                    sheet.write_string_with_format(row, col, cell, &right)?;
                }
                (Align::Left, _) => {
                    sheet.write_string(row, col, cell)?;
                }
            }
        }
        row += 1;
    }

    if !doc.totals.is_empty() {
        row += 1;
        let label_col = doc.columns.len().saturating_sub(2) as u16;
        let value_col = doc.columns.len().saturating_sub(1) as u16;
        for (label, value) in &doc.totals {
            sheet.write_string_with_format(row, label_col, label, &bold)?;
            match value.parse::<f64>() {
                Ok(number) => sheet.write_number_with_format(row, value_col, number, &bold)?,
                Err(_) => sheet.write_string_with_format(row, value_col, value, &bold)?,
            };
            row += 1;
        }
    }

    for col in 0..doc.columns.len() {
        sheet.set_column_width(col as u16, column_width(doc, col))?;
    }
    sheet.set_freeze_panes(header_row + 1, 0)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("Orders: 2024/05"), "Orders 202405");
        assert_eq!(sheet_name("[]"), "Report");
        assert_eq!(sheet_name(&"a".repeat(40)).len(), MAX_SHEET_NAME);
    }

    #[test]
    fn column_width_tracks_longest_cell() {
        let doc = super::super::tests::sample_document();
        assert_eq!(column_width(&doc, 0), 14.0);
        assert_eq!(column_width(&doc, 2), 10.0);
    }

    #[test]
    fn renders_workbook_with_totals() {
        let doc = super::super::tests::sample_document();
        let bytes = render_xlsx(&doc).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
