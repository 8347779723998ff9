//! Filter parsing and evaluation.
//!
//! Filters arrive as raw strings (command-line flags or the `[filter]`
//! section of the config file) and are validated into a [`ReportFilter`]
//! before any record is read. A record passes when every supplied predicate
//! matches; an empty list for a dimension places no restriction on it.

use crate::error::ValidationError;
use crate::models::{parse_date, ClassYear, Labeled, Major, ReturnStatus, StudentRecord, DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Unvalidated filter input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFilter {
    /// Inclusive lower bound on the return date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// Inclusive upper bound on the return date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// Allowed class years (codes or labels).
    #[serde(default)]
    pub class_status: Vec<String>,

    /// Allowed majors (codes or labels).
    #[serde(default)]
    pub major: Vec<String>,

    /// Allowed return statuses (codes or labels).
    #[serde(default)]
    pub return_status: Vec<String>,
}

impl RawFilter {
    /// Overlay `other` on top of `self`. Any dimension `other` sets replaces
    /// the one in `self`.
    pub fn overlay(&mut self, other: &RawFilter) {
        if other.start_date.is_some() {
            self.start_date = other.start_date.clone();
        }
        if other.end_date.is_some() {
            self.end_date = other.end_date.clone();
        }
        if !other.class_status.is_empty() {
            self.class_status = other.class_status.clone();
        }
        if !other.major.is_empty() {
            self.major = other.major.clone();
        }
        if !other.return_status.is_empty() {
            self.return_status = other.return_status.clone();
        }
    }
}

/// Validated filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub class_years: Vec<ClassYear>,
    pub majors: Vec<Major>,
    pub statuses: Vec<ReturnStatus>,
}

impl ReportFilter {
    /// Validate raw input. Blank dates count as absent; every other bad
    /// value is rejected.
    pub fn parse(raw: &RawFilter) -> Result<Self, ValidationError> {
        let start_date = parse_bound("start_date", raw.start_date.as_deref())?;
        let end_date = parse_bound("end_date", raw.end_date.as_deref())?;

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(ValidationError::InvertedDateRange { start, end });
            }
        }

        Ok(Self {
            start_date,
            end_date,
            class_years: parse_all(&raw.class_status)?,
            majors: parse_all(&raw.major)?,
            statuses: parse_all(&raw.return_status)?,
        })
    }

    /// True when no predicate is set.
    pub fn is_unrestricted(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.class_years.is_empty()
            && self.majors.is_empty()
            && self.statuses.is_empty()
    }

    /// Whether the date predicate is active.
    pub fn has_date_range(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Evaluate every predicate against one record.
    pub fn matches(&self, record: &StudentRecord) -> bool {
        if self.has_date_range() {
            let Some(date) = record.return_date() else {
                return false;
            };
            if self.start_date.is_some_and(|start| date < start) {
                return false;
            }
            if self.end_date.is_some_and(|end| date > end) {
                return false;
            }
        }

        (self.class_years.is_empty() || self.class_years.contains(&record.class_year))
            && (self.majors.is_empty() || self.majors.contains(&record.major))
            && (self.statuses.is_empty() || self.statuses.contains(&record.return_status))
    }

    /// Borrow the records that pass.
    pub fn apply<'a>(&self, records: &'a [StudentRecord]) -> Vec<&'a StudentRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// One-line human summary, e.g. for report headers.
    pub fn describe(&self) -> String {
        if self.is_unrestricted() {
            return "none".to_string();
        }

        let mut parts = Vec::new();
        match (self.start_date, self.end_date) {
            (Some(s), Some(e)) => parts.push(format!(
                "return date {} to {}",
                s.format(DATE_FORMAT),
                e.format(DATE_FORMAT)
            )),
            (Some(s), None) => parts.push(format!("return date from {}", s.format(DATE_FORMAT))),
            (None, Some(e)) => parts.push(format!("return date until {}", e.format(DATE_FORMAT))),
            (None, None) => {}
        }
        if !self.class_years.is_empty() {
            parts.push(format!("class_status in [{}]", join_codes(&self.class_years)));
        }
        if !self.majors.is_empty() {
            parts.push(format!("major in [{}]", join_codes(&self.majors)));
        }
        if !self.statuses.is_empty() {
            parts.push(format!("return_status in [{}]", join_codes(&self.statuses)));
        }
        parts.join("; ")
    }
}

fn parse_bound(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}

fn parse_all<T>(values: &[String]) -> Result<Vec<T>, ValidationError>
where
    T: std::str::FromStr<Err = ValidationError> + PartialEq,
{
    let mut parsed: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        let v: T = value.parse()?;
        if !parsed.contains(&v) {
            parsed.push(v);
        }
    }
    Ok(parsed)
}

fn join_codes<T: Labeled>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.code())
        .collect::<Vec<_>>()
        .join(", ")
}
