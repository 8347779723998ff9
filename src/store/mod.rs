//! Record storage.
//!
//! The aggregator reads a snapshot through [`RecordStore::fetch`]; bulk
//! import and test-data generation write through [`RecordStore::upsert`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::filter::ReportFilter;
use crate::models::StudentRecord;
use anyhow::Result;
use tracing::debug;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A keyed collection of student records.
pub trait RecordStore {
    /// Records matching every predicate of `filter`.
    fn fetch(&self, filter: &ReportFilter) -> Result<Vec<StudentRecord>>;

    /// Insert, or replace the record with the same `student_id`.
    fn upsert(&mut self, record: StudentRecord) -> Result<UpsertOutcome>;

    /// Upsert many records at once. Backends may batch this.
    fn upsert_all(&mut self, records: Vec<StudentRecord>) -> Result<Vec<UpsertOutcome>> {
        records.into_iter().map(|r| self.upsert(r)).collect()
    }

    /// Number of stored records.
    fn len(&self) -> Result<usize>;

    /// Remove every record.
    fn clear(&mut self) -> Result<()>;

    /// Every record, in store order.
    fn all(&self) -> Result<Vec<StudentRecord>> {
        self.fetch(&ReportFilter::default())
    }
}

/// Validate and normalize a record before it is stored.
pub(crate) fn prepare(mut record: StudentRecord) -> Result<StudentRecord> {
    record.validate()?;
    record.student_id = record.student_id.trim().to_string();
    if record.normalize() {
        debug!(
            "Cleared return time/method on {} (status {})",
            record.student_id, record.return_status
        );
    }
    Ok(record)
}
