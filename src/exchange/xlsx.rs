//! Spreadsheet import and export.
//!
//! Reading goes through calamine and takes the first worksheet of any
//! workbook it understands (xlsx, xlsm, xls, ods). Writing produces xlsx
//! only, with a bold header row.

use super::rows::{collect_rows, record_cells, ImportOptions, ParsedFile, HEADER};
use crate::error::ImportError;
use crate::models::{StudentRecord, TIMESTAMP_FORMAT};
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::io::{Read, Seek};

/// Name of the exported worksheet.
pub const SHEET_NAME: &str = "学生返校数据";

/// Read the first worksheet into records. Its first row is the header.
pub fn read_workbook<R: Read + Seek + Clone>(
    reader: R,
    options: ImportOptions,
) -> Result<ParsedFile, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::EmptyWorkbook)??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    let rows = rows.map(|row| Ok(row.iter().map(cell_text).collect()));
    collect_rows(&headers, rows, options)
}

/// Serialize records into an xlsx workbook.
pub fn write_workbook(records: &[StudentRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, name) in HEADER.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in record_cells(record).iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(row, col as u16, value.as_str())?;
            }
        }
    }
    sheet.autofit();

    workbook.save_to_buffer()
}

/// Text of a cell as the row converter expects it.
///
/// Whole numbers lose their `.0` so numeric ids and phone numbers read back
/// unchanged. Date-formatted cells become `YYYY-MM-DD HH:MM:SS`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}
