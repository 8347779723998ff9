//! Bulk import and export of student records.

//!
//! Files ending in `.xlsx`, `.xlsm`, `.xls` or `.ods` are read as
//! spreadsheets, anything else as CSV. Only `.xlsx` can be written.

mod csv_io;
mod rows;
mod xlsx;

pub use csv_io::{read_records, write_records};
pub use rows::{ImportOptions, ParsedFile};
pub use xlsx::{read_workbook, write_workbook};

use crate::models::StudentRecord;
use crate::store::{RecordStore, UpsertOutcome};
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::{debug, info};

/// Rows upserted per store call; each batch is one transaction on SQLite.
const BATCH_SIZE: usize = 250;

/// Result of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl ImportSummary {
    /// Rows that reached the store.
    pub fn stored(&self) -> usize {
        self.inserted + self.updated
    }
}

/// On-disk layout of an import or export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("xlsx" | "xlsm" | "xls" | "ods") => FileFormat::Spreadsheet,
            _ => FileFormat::Csv,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Read a CSV or spreadsheet file into records.
pub fn read_file(path: &Path, options: ImportOptions) -> Result<ParsedFile> {
    let format = FileFormat::from_path(path);
    debug!("Reading {} as {:?}", path.display(), format);

    let parsed = match format {
        FileFormat::Csv => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            read_records(BufReader::new(file), options)
        }
        FileFormat::Spreadsheet => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            read_workbook(Cursor::new(bytes), options)
        }
    };
    parsed.with_context(|| format!("Failed to read {}", path.display()))
}

/// Write records as CSV, or as a workbook for an `.xlsx` path.
pub fn write_file(path: &Path, records: &[StudentRecord]) -> Result<usize> {
    match FileFormat::from_path(path) {
        FileFormat::Csv => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_records(file, records)
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        FileFormat::Spreadsheet => {
            if extension(path).as_deref() != Some("xlsx") {
                bail!(
                    "Cannot write {}: spreadsheets are written as .xlsx only",
                    path.display()
                );
            }
            let bytes = write_workbook(records)
                .with_context(|| format!("Failed to build workbook for {}", path.display()))?;
            std::fs::write(path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(records.len())
        }
    }
}

/// Read a CSV or spreadsheet file and upsert every row into `store`.
pub fn import_file<S: RecordStore + ?Sized>(
    store: &mut S,
    path: &Path,
    options: ImportOptions,
    progress: &ProgressBar,
) -> Result<ImportSummary> {
    let parsed = read_file(path, options)?;
    store_parsed(store, parsed, progress)
}

/// Upsert already-parsed rows in batches, advancing `progress` per row.
pub fn store_parsed<S: RecordStore + ?Sized>(
    store: &mut S,
    parsed: ParsedFile,
    progress: &ProgressBar,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        skipped: parsed.skipped,
        ..ImportSummary::default()
    };
    progress.set_length(parsed.records.len() as u64);

    let mut records = parsed.records.into_iter().peekable();
    while records.peek().is_some() {
        let batch: Vec<_> = records.by_ref().take(BATCH_SIZE).collect();
        let size = batch.len();
        let outcomes = store.upsert_all(batch).with_context(|| {
            format!(
                "Failed to store rows {}..{}",
                summary.stored() + 1,
                summary.stored() + size
            )
        })?;
        for outcome in outcomes {
            match outcome {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
            }
        }
        progress.inc(size as u64);
    }

    info!(
        "Imported {} rows: {} new, {} updated, {} skipped",
        summary.stored(),
        summary.inserted,
        summary.updated,
        summary.skipped
    );
    Ok(summary)
}

/// Write every record of `store` to a CSV or `.xlsx` file.
pub fn export_file<S: RecordStore + ?Sized>(store: &S, path: &Path) -> Result<usize> {
    let records = store.all()?;
    let written = write_file(path, &records)?;
    info!("Exported {} records to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SqliteStore};
    use std::io::Write;

    const ROWS: &str = "\
学号,姓名,性别,年级,专业,返校状态,返校时间,返校方式,联系电话,备注
1,A,男,大一,土木工程,已返校,2024-02-18 07:30:00,火车,,
2,B,女,大二,工商管理,未返校,,,,
1,A2,男,大一,土木工程,延期返校,,,,
,C,女,大二,工商管理,未返校,,,,
";

    #[test]
    fn test_import_counts_updates_and_skips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ROWS.as_bytes()).unwrap();

        let mut store = MemoryStore::new();
        let summary = import_file(
            &mut store,
            file.path(),
            ImportOptions::default(),
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                updated: 1,
                skipped: 1
            }
        );
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.records()[0].name, "A2");
    }

    #[test]
    fn test_export_file_from_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let parsed = read_records(ROWS.as_bytes(), ImportOptions::default()).unwrap();
        store_parsed(&mut store, parsed, &ProgressBar::hidden()).unwrap();

        let out = dir.path().join("students.csv");
        assert_eq!(export_file(&store, &out).unwrap(), 2);

        let reread = read_records(File::open(&out).unwrap(), ImportOptions { strict: true }).unwrap();
        assert_eq!(reread.records, store.all().unwrap());
    }

    #[test]
    fn test_large_import_spans_batches() {
        let records: Vec<_> = (0..BATCH_SIZE * 2 + 7)
            .map(|i| {
                crate::models::tests::record(
                    &i.to_string(),
                    crate::models::ClassYear::Junior,
                    crate::models::Major::Business,
                    crate::models::ReturnStatus::NotReturned,
                )
            })
            .collect();
        let progress = ProgressBar::hidden();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let summary = store_parsed(&mut store, ParsedFile { records, skipped: 0 }, &progress).unwrap();
        assert_eq!(summary.inserted, BATCH_SIZE * 2 + 7);
        assert_eq!(progress.position(), (BATCH_SIZE * 2 + 7) as u64);
        assert_eq!(store.len().unwrap(), BATCH_SIZE * 2 + 7);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.csv")), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("a")), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("a.XLSX")), FileFormat::Spreadsheet);
        assert_eq!(FileFormat::from_path(Path::new("dir/a.xls")), FileFormat::Spreadsheet);
    }

    #[test]
    fn test_xlsx_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let parsed = read_records(ROWS.as_bytes(), ImportOptions::default()).unwrap();
        store_parsed(&mut store, parsed, &ProgressBar::hidden()).unwrap();

        let out = dir.path().join("students.xlsx");
        assert_eq!(export_file(&store, &out).unwrap(), 2);

        let mut copy = MemoryStore::new();
        let summary = import_file(
            &mut copy,
            &out,
            ImportOptions { strict: true },
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(copy.all().unwrap(), store.all().unwrap());
    }

    #[test]
    fn test_legacy_spreadsheet_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        assert!(export_file(&store, &dir.path().join("students.xls")).is_err());
    }

    #[test]
    fn test_import_missing_file() {
        let mut store = MemoryStore::new();
        let err = import_file(
            &mut store,
            Path::new("/nonexistent/students.csv"),
            ImportOptions::default(),
            &ProgressBar::hidden(),
        );
        assert!(err.is_err());
    }
}
