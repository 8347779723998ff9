//! Row conversion shared by the CSV and spreadsheet formats.
//!
//! Files use the display-label header and display-label cells of the
//! dashboard exchange format, so exported files can be re-imported and
//! edited in a spreadsheet. On import every categorical cell may hold either
//! the display label or the code, and the English column names are accepted
//! as header aliases.

use crate::error::{ImportError, ValidationError};
use crate::models::{
    parse_return_time, ClassYear, Gender, Labeled, Major, ReturnMethod, ReturnStatus,
    StudentRecord, TIMESTAMP_FORMAT,
};
use tracing::{debug, warn};

/// Exported header, in column order.
pub const HEADER: [&str; 10] = [
    "学号", "姓名", "性别", "年级", "专业", "返校状态", "返校时间", "返校方式", "联系电话", "备注",
];

/// Code-style aliases for [`HEADER`], same order.
const HEADER_ALIASES: [&str; 10] = [
    "student_id",
    "name",
    "gender",
    "class_status",
    "major",
    "return_status",
    "return_time",
    "return_method",
    "contact",
    "remarks",
];

const COL_ID: usize = 0;
const COL_NAME: usize = 1;
const COL_GENDER: usize = 2;
const COL_CLASS: usize = 3;
const COL_MAJOR: usize = 4;
const COL_STATUS: usize = 5;
const COL_TIME: usize = 6;
const COL_METHOD: usize = 7;
const COL_CONTACT: usize = 8;
const COL_REMARKS: usize = 9;

/// How unexpected cells are handled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Reject the file on the first bad cell instead of substituting a default.
    pub strict: bool,
}

/// Rows read from a file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub records: Vec<StudentRecord>,
    /// Rows dropped for lacking a student id.
    pub skipped: usize,
}

/// Convert a header row and the data rows under it. Row `i` of `rows` is
/// reported as line `i + 2`.
pub(super) fn collect_rows<I>(
    headers: &[String],
    rows: I,
    options: ImportOptions,
) -> Result<ParsedFile, ImportError>
where
    I: IntoIterator<Item = Result<Vec<String>, ImportError>>,
{
    let columns = Columns::locate(headers)?;
    let mut parsed = ParsedFile::default();

    for (i, row) in rows.into_iter().enumerate() {
        let line = i + 2;
        let row = row?;
        match columns
            .convert(&row, line, options)
            .map_err(|source| ImportError::Row { row: line, source })?
        {
            Some(record) => parsed.records.push(record),
            None => {
                warn!("Row {}: empty student id, skipped", line);
                parsed.skipped += 1;
            }
        }
    }

    debug!(
        "Read {} rows ({} skipped)",
        parsed.records.len() + parsed.skipped,
        parsed.skipped
    );
    Ok(parsed)
}

/// One record as exported cells, in [`HEADER`] order.
pub(super) fn record_cells(r: &StudentRecord) -> [String; 10] {
    [
        r.student_id.clone(),
        r.name.clone(),
        r.gender.label().to_string(),
        r.class_year.label().to_string(),
        r.major.label().to_string(),
        r.return_status.label().to_string(),
        r.return_time
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default(),
        r.return_method
            .as_ref()
            .map(|m| m.label().to_string())
            .unwrap_or_default(),
        r.contact.clone(),
        r.remarks.clone(),
    ]
}

/// Header position of each known column.
struct Columns {
    index: [Option<usize>; 10],
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self, ImportError> {
        let mut index = [None; 10];
        for (pos, name) in headers.iter().enumerate() {
            let name = name.trim_start_matches('\u{feff}').trim();
            if let Some(col) = HEADER
                .iter()
                .position(|h| *h == name)
                .or_else(|| HEADER_ALIASES.iter().position(|h| h.eq_ignore_ascii_case(name)))
            {
                index[col].get_or_insert(pos);
            }
        }

        for required in [COL_ID, COL_NAME] {
            if index[required].is_none() {
                return Err(ImportError::MissingColumn(HEADER[required]));
            }
        }
        Ok(Self { index })
    }

    fn cell<'r>(&self, row: &'r [String], col: usize) -> &'r str {
        self.index[col]
            .and_then(|pos| row.get(pos))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    /// `Ok(None)` for a row without a student id.
    fn convert(
        &self,
        row: &[String],
        line: usize,
        options: ImportOptions,
    ) -> Result<Option<StudentRecord>, ValidationError> {
        let student_id = self.cell(row, COL_ID);
        if student_id.is_empty() {
            return Ok(None);
        }

        let cells = Cells {
            line,
            strict: options.strict,
        };

        let gender = cells.enum_or(self.cell(row, COL_GENDER), Gender::Male)?;
        let class_year = cells.enum_or(self.cell(row, COL_CLASS), ClassYear::Freshman)?;
        let major = cells.enum_or(self.cell(row, COL_MAJOR), Major::Computer)?;
        let return_status = cells.enum_or(self.cell(row, COL_STATUS), ReturnStatus::NotReturned)?;
        let return_method = cells.optional_method(self.cell(row, COL_METHOD))?;
        let return_time = cells.optional_time(self.cell(row, COL_TIME))?;

        Ok(Some(StudentRecord {
            student_id: student_id.to_string(),
            name: self.cell(row, COL_NAME).to_string(),
            gender,
            class_year,
            major,
            return_status,
            return_time,
            return_method,
            contact: self.cell(row, COL_CONTACT).to_string(),
            remarks: self.cell(row, COL_REMARKS).to_string(),
        }))
    }
}

/// Per-row cell conversion with the strict/lenient policy.
struct Cells {
    line: usize,
    strict: bool,
}

impl Cells {
    fn enum_or<T>(&self, raw: &str, default: T) -> Result<T, ValidationError>
    where
        T: std::str::FromStr<Err = ValidationError> + Labeled,
    {
        match raw.parse::<T>() {
            Ok(v) => Ok(v),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!("Row {}: {}, using {}", self.line, e, default.code());
                Ok(default)
            }
        }
    }

    fn optional_method(&self, raw: &str) -> Result<Option<ReturnMethod>, ValidationError> {
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<ReturnMethod>() {
            Ok(m) => Ok(Some(m)),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!("Row {}: {}, left empty", self.line, e);
                Ok(None)
            }
        }
    }

    fn optional_time(&self, raw: &str) -> Result<Option<chrono::NaiveDateTime>, ValidationError> {
        if raw.is_empty() {
            return Ok(None);
        }
        match parse_return_time(raw) {
            Ok(t) => Ok(Some(t)),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!("Row {}: {}, left empty", self.line, e);
                Ok(None)
            }
        }
    }
}
