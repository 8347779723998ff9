//! Typed errors for input validation and bulk import.

/// Rejected input: a filter value, a record field, or a date that does not parse.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A value outside a fixed enumeration.
    #[error("unknown {field} value: {value:?}")]
    UnknownValue { field: &'static str, value: String },

    /// A field that must not be empty.
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    /// A date that is not `YYYY-MM-DD`.
    #[error("invalid {field}: {value:?} (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    /// A timestamp in none of the accepted formats.
    #[error("invalid return time: {0:?}")]
    InvalidTimestamp(String),

    /// Lower date bound after the upper one.
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Failure while reading an import file.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    /// The underlying reader failed.
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),

    /// The workbook could not be opened or its sheet read.
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// The workbook has no worksheet.
    #[error("workbook has no worksheet")]
    EmptyWorkbook,

    /// A required column is missing from the header.
    #[error("missing column {0:?} in header")]
    MissingColumn(&'static str),

    /// A cell could not be converted (strict mode only).
    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: ValidationError,
    },
}
