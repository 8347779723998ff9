//! CSV import and export.

use super::rows::{collect_rows, record_cells, ImportOptions, ParsedFile, HEADER};
use crate::error::ImportError;
use crate::models::StudentRecord;
use std::io::{Read, Write};

/// Read every row of a CSV file into records.
pub fn read_records<R: Read>(reader: R, options: ImportOptions) -> Result<ParsedFile, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
    let rows = rdr.records().map(|row| {
        row.map(|r| r.iter().map(String::from).collect())
            .map_err(ImportError::from)
    });
    collect_rows(&headers, rows, options)
}

/// Write records with the display-label header.
pub fn write_records<'a, W, I>(writer: W, records: I) -> Result<usize, csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    let mut written = 0;
    for r in records {
        wtr.write_record(record_cells(r))?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}
