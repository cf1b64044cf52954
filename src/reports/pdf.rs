use super::{Align, ReportDocument};
use crate::errors::ServiceError;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use std::ops::Range;

const A4_SHORT_MM: f32 = 210.0;
const A4_LONG_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const ROW_HEIGHT_MM: f32 = 6.0;
const TABLE_FONT_PT: f32 = 8.0;
const FOOTER_MM: f32 = 10.0;
/// Tables wider than this are laid out in landscape
const PORTRAIT_MAX_COLUMNS: usize = 6;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.52;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PageSize {
    width: f32,
    height: f32,
}

impl PageSize {
    fn for_columns(columns: usize) -> Self {
        if columns > PORTRAIT_MAX_COLUMNS {
            PageSize {
                width: A4_LONG_MM,
                height: A4_SHORT_MM,
            }
        } else {
            PageSize {
                width: A4_SHORT_MM,
                height: A4_LONG_MM,
            }
        }
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * MARGIN_MM
    }
}

fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * AVG_GLYPH_WIDTH * PT_TO_MM
}

/// Shortens `text` so that it fits in `width_mm`, marking the cut with "..."
fn fit_text(text: &str, width_mm: f32, size_pt: f32) -> String {
    let glyph = size_pt * AVG_GLYPH_WIDTH * PT_TO_MM;
    let max_chars = ((width_mm - 1.5) / glyph).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Splits the available width between columns in proportion to their widest cell.
fn column_widths(doc: &ReportDocument, available: f32) -> Vec<f32> {
    let weights: Vec<f32> = doc
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let widest = doc
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(col.header.chars().count()))
                .max()
                .unwrap_or(1);
            widest.clamp(4, 40) as f32
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.iter().map(|w| available * w / total).collect()
}

/// Row ranges per page given how many rows fit on the first and later pages.
fn paginate(rows: usize, first_page: usize, other_pages: usize) -> Vec<Range<usize>> {
    let first_page = first_page.max(1);
    let other_pages = other_pages.max(1);
    let mut pages = vec![0..rows.min(first_page)];
    let mut start = first_page;
    while start < rows {
        let end = (start + other_pages).min(rows);
        pages.push(start..end);
        start = end;
    }
    pages
}

fn draw_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.set_outline_thickness(0.4);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn draw_cell(
    layer: &PdfLayerReference,
    text: &str,
    align: Align,
    x: f32,
    width: f32,
    y: f32,
    font: &IndirectFontRef,
) {
    let text = fit_text(text, width, TABLE_FONT_PT);
    let x = match align {
        Align::Left => x + 0.75,
        Align::Right => x + width - 0.75 - text_width_mm(&text, TABLE_FONT_PT),
    };
    layer.use_text(text, TABLE_FONT_PT, Mm(x), Mm(y), font);
}

fn draw_table_header(
    layer: &PdfLayerReference,
    doc: &ReportDocument,
    widths: &[f32],
    y: f32,
    fonts: &Fonts,
) {
    let mut x = MARGIN_MM;
    for (col, width) in doc.columns.iter().zip(widths) {
        draw_cell(layer, &col.header, col.align, x, *width, y, &fonts.bold);
        x += width;
    }
    draw_rule(layer, MARGIN_MM, MARGIN_MM + widths.iter().sum::<f32>(), y - 1.8);
}

/// Draws the title band and summary; returns the y position below it.
fn draw_header_band(
    layer: &PdfLayerReference,
    doc: &ReportDocument,
    page: PageSize,
    fonts: &Fonts,
) -> f32 {
    let mut y = page.height - MARGIN_MM - 4.0;
    layer.use_text(doc.title.clone(), 16.0, Mm(MARGIN_MM), Mm(y), &fonts.bold);
    y -= 6.5;
    if let Some(subtitle) = &doc.subtitle {
        layer.use_text(subtitle.clone(), 10.0, Mm(MARGIN_MM), Mm(y), &fonts.regular);
        y -= 5.0;
    }
    layer.use_text(
        format!("Generated {}", doc.generated_at.format("%Y-%m-%d %H:%M UTC")),
        8.0,
        Mm(MARGIN_MM),
        Mm(y),
        &fonts.regular,
    );
    y -= 3.0;
    draw_rule(layer, MARGIN_MM, page.width - MARGIN_MM, y);
    y -= 5.0;

    for (label, value) in &doc.summary {
        layer.use_text(format!("{}:", label), 9.0, Mm(MARGIN_MM), Mm(y), &fonts.bold);
        layer.use_text(value.clone(), 9.0, Mm(MARGIN_MM + 40.0), Mm(y), &fonts.regular);
        y -= 5.0;
    }
    if !doc.summary.is_empty() {
        y -= 2.0;
    }
    y
}

fn draw_footer(layer: &PdfLayerReference, page: PageSize, number: usize, count: usize, fonts: &Fonts) {
    let label = format!("Page {} of {}", number, count);
    let x = page.width - MARGIN_MM - text_width_mm(&label, 8.0);
    layer.use_text(label, 8.0, Mm(x), Mm(MARGIN_MM - 5.0), &fonts.regular);
}

fn export_err(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::ExportError(format!("PDF rendering failed: {}", e))
}

fn load_fonts(pdf: &PdfDocumentReference) -> Result<Fonts, ServiceError> {
    Ok(Fonts {
        regular: pdf.add_builtin_font(BuiltinFont::Helvetica).map_err(export_err)?,
        bold: pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(export_err)?,
    })
}

/// Renders the document as an A4 PDF with a paginated table.
pub fn render_pdf(doc: &ReportDocument) -> Result<Vec<u8>, ServiceError> {
    let page = PageSize::for_columns(doc.columns.len());
    let (pdf, first_page, first_layer) =
        PdfDocument::new(&doc.title, Mm(page.width), Mm(page.height), "Layer 1");
    let fonts = load_fonts(&pdf)?;
    let widths = column_widths(doc, page.content_width());

    // Vertical budget: header band on page one, table header on every page,
    // footer space at the bottom and room for the totals block.
    let first_layer_ref = pdf.get_page(first_page).get_layer(first_layer);
    let band_bottom = draw_header_band(&first_layer_ref, doc, page, &fonts);
    let table_floor = MARGIN_MM + FOOTER_MM;
    let first_capacity = ((band_bottom - ROW_HEIGHT_MM - table_floor) / ROW_HEIGHT_MM) as usize;
    let top = page.height - MARGIN_MM - 4.0;
    let other_capacity = ((top - ROW_HEIGHT_MM - table_floor) / ROW_HEIGHT_MM) as usize;

    let mut pages = paginate(doc.rows.len(), first_capacity, other_capacity);
    let totals_height = (doc.totals.len() as f32 + 1.0) * ROW_HEIGHT_MM;
    let last_rows = pages.last().map(|r| r.len()).unwrap_or(0);
    let last_top = if pages.len() == 1 { band_bottom } else { top };
    let last_bottom = last_top - ROW_HEIGHT_MM * (last_rows as f32 + 1.0);
    let totals_need_page = !doc.totals.is_empty() && last_bottom - totals_height < table_floor;
    if totals_need_page {
        pages.push(doc.rows.len()..doc.rows.len());
    }
    let page_count = pages.len();

    let mut cursor = band_bottom;
    for (index, rows) in pages.iter().enumerate() {
        let layer = if index == 0 {
            first_layer_ref.clone()
        } else {
            let (p, l) = pdf.add_page(Mm(page.width), Mm(page.height), "Layer 1");
            cursor = top;
            pdf.get_page(p).get_layer(l)
        };

        let is_totals_only = totals_need_page && index + 1 == page_count;
        if !is_totals_only {
            draw_table_header(&layer, doc, &widths, cursor, &fonts);
            cursor -= ROW_HEIGHT_MM;
            for row in &doc.rows[rows.clone()] {
                let mut x = MARGIN_MM;
                for ((cell, col), width) in row.iter().zip(&doc.columns).zip(&widths) {
                    draw_cell(&layer, cell, col.align, x, *width, cursor, &fonts.regular);
                    x += width;
                }
                cursor -= ROW_HEIGHT_MM;
            }
            if doc.rows.is_empty() {
                layer.use_text("No records", TABLE_FONT_PT, Mm(MARGIN_MM + 0.75), Mm(cursor), &fonts.regular);
                cursor -= ROW_HEIGHT_MM;
            }
        }

        if index + 1 == page_count && !doc.totals.is_empty() {
            draw_rule(&layer, MARGIN_MM, page.width - MARGIN_MM, cursor + ROW_HEIGHT_MM - 1.8);
            let value_right = page.width - MARGIN_MM;
            for (label, value) in &doc.totals {
                layer.use_text(format!("{}:", label), 9.0, Mm(value_right - 80.0), Mm(cursor), &fonts.bold);
                let x = value_right - text_width_mm(value, 9.0);
                layer.use_text(value.clone(), 9.0, Mm(x), Mm(cursor), &fonts.regular);
                cursor -= ROW_HEIGHT_MM;
            }
        }

        draw_footer(&layer, page, index + 1, page_count, &fonts);
    }

    pdf.save_to_bytes().map_err(export_err)
}
