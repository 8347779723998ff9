//! In-memory record store, used for reports straight from a CSV file.

use super::{prepare, RecordStore, UpsertOutcome};
use crate::filter::ReportFilter;
use crate::models::StudentRecord;
use anyhow::Result;
use std::collections::HashMap;

/// Records in insertion order with an id index.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<StudentRecord>,
    by_id: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the stored records without cloning.
    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }
}

impl RecordStore for MemoryStore {
    fn fetch(&self, filter: &ReportFilter) -> Result<Vec<StudentRecord>> {
        Ok(filter.apply(&self.records).into_iter().cloned().collect())
    }

    fn upsert(&mut self, record: StudentRecord) -> Result<UpsertOutcome> {
        let record = prepare(record)?;
        match self.by_id.get(&record.student_id) {
            Some(&idx) => {
                self.records[idx] = record;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                self.by_id
                    .insert(record.student_id.clone(), self.records.len());
                self.records.push(record);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.by_id.clear();
        Ok(())
    }
}
