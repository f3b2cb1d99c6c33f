//! Spreadsheet export
//!
//! Writes scraped records to a single-sheet `.xlsx` workbook with Korean
//! column headers, one column per active field in canonical order.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use serde_json::{Map, Value};
use std::path::Path;

use crate::models::{Field, PostDetail};
use crate::utils::error::ExportError;
use crate::utils::truncate_chars;

/// Worksheet name
pub const SHEET_NAME: &str = "블로그 스크래핑 결과";

/// Download file name
pub const FILE_NAME: &str = "blog_scraping_result.xlsx";

/// MIME type of the workbook
pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Longest text written to a cell; Excel rejects anything over 32767
pub const MAX_CELL_CHARS: usize = 32000;

const FONT_NAME: &str = "맑은 고딕";
const HEADER_FILL: u32 = 0x2E7D32;

fn header_format() -> Format {
    Format::new()
        .set_font_name(FONT_NAME)
        .set_font_size(11)
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
}

fn data_format() -> Format {
    Format::new()
        .set_font_name(FONT_NAME)
        .set_font_size(10)
        .set_align(FormatAlign::Top)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
}

/// Records for the given details, restricted to `fields`
pub fn details_to_records(details: &[PostDetail], fields: &[Field]) -> Vec<Map<String, Value>> {
    details.iter().map(|d| d.to_record(fields)).collect()
}

/// Build a workbook from records keyed by field wire name
///
/// Missing values become empty cells. Numbers stay numeric; text is cut to
/// [`MAX_CELL_CHARS`] characters.
///
/// # Errors
///
/// Returns `ExportError::Xlsx` if the writer rejects a cell or setting
pub fn build_workbook(
    records: &[Map<String, Value>],
    fields: &[Field],
) -> Result<Workbook, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header = header_format();
    let data = data_format();

    for (col, field) in fields.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, field.label(), &header)?;
        worksheet.set_column_width(col, field.column_width())?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = u32::try_from(index + 1).unwrap_or(u32::MAX);

        for (col, field) in fields.iter().enumerate() {
            let col = col as u16;
            match record.get(field.as_str()) {
                Some(Value::Number(n)) => {
                    worksheet.write_number_with_format(row, col, n.as_f64().unwrap_or(0.0), &data)?;
                }
                Some(Value::String(s)) => {
                    worksheet.write_string_with_format(row, col, truncate_chars(s, MAX_CELL_CHARS), &data)?;
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean_with_format(row, col, *b, &data)?;
                }
                Some(Value::Null) | None => {
                    worksheet.write_blank(row, col, &data)?;
                }
                Some(other) => {
                    let text = other.to_string();
                    worksheet.write_string_with_format(row, col, truncate_chars(&text, MAX_CELL_CHARS), &data)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;

    tracing::debug!(rows = records.len(), columns = fields.len(), "Workbook built");
    Ok(workbook)
}

/// Workbook bytes for download
///
/// # Errors
///
/// Returns `ExportError::Xlsx` if the workbook cannot be built or serialized
pub fn to_xlsx_bytes(records: &[Map<String, Value>], fields: &[Field]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = build_workbook(records, fields)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write the workbook to `path`
///
/// # Errors
///
/// Returns `ExportError::Xlsx` if the workbook cannot be built or written
pub fn save_xlsx(
    path: &Path,
    records: &[Map<String, Value>],
    fields: &[Field],
) -> Result<(), ExportError> {
    let mut workbook = build_workbook(records, fields)?;
    workbook.save(path)?;
    tracing::info!(path = %path.display(), rows = records.len(), "Workbook saved");
    Ok(())
}
