//! SQLite-backed record store.
//!
//! One `students` table keyed by `student_id`. Enumerations are stored as
//! their codes and timestamps as `YYYY-MM-DD HH:MM:SS` text, so the filter
//! predicates can be pushed down into the `WHERE` clause.

use super::{prepare, RecordStore, UpsertOutcome};
use crate::filter::ReportFilter;
use crate::models::{
    ClassYear, Gender, Labeled, Major, ReturnMethod, ReturnStatus, StudentRecord, DATE_FORMAT,
    TIMESTAMP_FORMAT,
};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        info!("Opened record store at {}", path.display());
        Self::with_connection(conn)
    }

    /// A private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS students(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                gender TEXT NOT NULL,
                class_status TEXT NOT NULL,
                major TEXT NOT NULL,
                return_status TEXT NOT NULL,
                return_time TEXT,
                return_method TEXT,
                contact TEXT NOT NULL DEFAULT '',
                remarks TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_students_status ON students(return_status)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_students_class_major ON students(class_status, major)",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteStore {
    fn fetch(&self, filter: &ReportFilter) -> Result<Vec<StudentRecord>> {
        let (where_sql, args) = where_clause(filter);
        let sql = format!(
            "SELECT student_id, name, gender, class_status, major, return_status,
                    return_time, return_method, contact, remarks
             FROM students{}
             ORDER BY id",
            where_sql
        );
        debug!("fetch: {} ({} params)", sql.split_whitespace().collect::<Vec<_>>().join(" "), args.len());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(RawRow {
                    student_id: row.get(0)?,
                    name: row.get(1)?,
                    gender: row.get(2)?,
                    class_status: row.get(3)?,
                    major: row.get(4)?,
                    return_status: row.get(5)?,
                    return_time: row.get(6)?,
                    return_method: row.get(7)?,
                    contact: row.get(8)?,
                    remarks: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(RawRow::into_record).collect()
    }

    fn upsert(&mut self, record: StudentRecord) -> Result<UpsertOutcome> {
        upsert_on(&self.conn, prepare(record)?)
    }

    fn upsert_all(&mut self, records: Vec<StudentRecord>) -> Result<Vec<UpsertOutcome>> {
        let tx = self.conn.transaction()?;
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(upsert_on(&tx, prepare(record)?)?);
        }
        tx.commit()?;
        Ok(outcomes)
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn clear(&mut self) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM students", [])?;
        info!("Cleared {} records", removed);
        Ok(())
    }
}

fn upsert_on(conn: &Connection, record: StudentRecord) -> Result<UpsertOutcome> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM students WHERE student_id = ?1",
            [&record.student_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    let now = Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string();
    conn.execute(
        "INSERT INTO students(
            student_id, name, gender, class_status, major, return_status,
            return_time, return_method, contact, remarks, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
         ON CONFLICT(student_id) DO UPDATE SET
            name = excluded.name,
            gender = excluded.gender,
            class_status = excluded.class_status,
            major = excluded.major,
            return_status = excluded.return_status,
            return_time = excluded.return_time,
            return_method = excluded.return_method,
            contact = excluded.contact,
            remarks = excluded.remarks,
            updated_at = excluded.updated_at",
        params![
            record.student_id,
            record.name,
            record.gender.code(),
            record.class_year.code(),
            record.major.code(),
            record.return_status.code(),
            record
                .return_time
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            record.return_method.map(|m| m.code().to_string()),
            record.contact,
            record.remarks,
            now,
        ],
    )
    .with_context(|| format!("Failed to store student {}", record.student_id))?;

    Ok(if exists {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    })
}

/// Build the `WHERE` clause and its positional arguments.
fn where_clause(filter: &ReportFilter) -> (String, Vec<String>) {
    let mut conds: Vec<String> = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if filter.has_date_range() {
        conds.push("return_time IS NOT NULL".to_string());
    }
    if let Some(start) = filter.start_date {
        conds.push("date(return_time) >= ?".to_string());
        args.push(start.format(DATE_FORMAT).to_string());
    }
    if let Some(end) = filter.end_date {
        conds.push("date(return_time) <= ?".to_string());
        args.push(end.format(DATE_FORMAT).to_string());
    }

    push_in(&mut conds, &mut args, "class_status", &filter.class_years);
    push_in(&mut conds, &mut args, "major", &filter.majors);
    push_in(&mut conds, &mut args, "return_status", &filter.statuses);

    if conds.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", conds.join(" AND ")), args)
    }
}

fn push_in<T: Labeled>(conds: &mut Vec<String>, args: &mut Vec<String>, column: &str, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let marks = vec!["?"; values.len()].join(", ");
    conds.push(format!("{} IN ({})", column, marks));
    args.extend(values.iter().map(|v| v.code().to_string()));
}

struct RawRow {
    student_id: String,
    name: String,
    gender: String,
    class_status: String,
    major: String,
    return_status: String,
    return_time: Option<String>,
    return_method: Option<String>,
    contact: String,
    remarks: String,
}

impl RawRow {
    fn into_record(self) -> Result<StudentRecord> {
        let id = self.student_id;
        let return_time = match self.return_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(t) => Some(
                NaiveDateTime::parse_from_str(t, TIMESTAMP_FORMAT)
                    .with_context(|| format!("Bad return_time {:?} for student {}", t, id))?,
            ),
        };
        let return_method = match self.return_method.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(m) => Some(m.parse::<ReturnMethod>().with_context(|| format!("Bad row for student {}", id))?),
        };

        Ok(StudentRecord {
            gender: self
                .gender
                .parse::<Gender>()
                .with_context(|| format!("Bad row for student {}", id))?,
            class_year: self
                .class_status
                .parse::<ClassYear>()
                .with_context(|| format!("Bad row for student {}", id))?,
            major: self
                .major
                .parse::<Major>()
                .with_context(|| format!("Bad row for student {}", id))?,
            return_status: self
                .return_status
                .parse::<ReturnStatus>()
                .with_context(|| format!("Bad row for student {}", id))?,
            return_time,
            return_method,
            name: self.name,
            contact: self.contact,
            remarks: self.remarks,
            student_id: id,
        })
    }
}
