//! Data models for student return records.
//!
//! Every categorical field is an ordered enumeration. The declaration order
//! is the order used by every table in the dashboard bundle, and each value
//! carries two strings: the stable `code` stored in the database and the
//! display `label` used by the dashboard and the CSV exchange format.

use crate::error::ValidationError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used for storage and export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Calendar date layout used for filters and daily labels.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which string of a categorical value ends up in rendered tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// Display labels (default)
    #[default]
    Display,
    /// Raw codes
    Code,
}

/// A categorical value with a stable code and a display label.
pub trait Labeled {
    fn code(&self) -> &str;
    fn label(&self) -> &str;

    /// The string to show under the given style.
    fn text(&self, style: LabelStyle) -> String {
        match style {
            LabelStyle::Display => self.label().to_string(),
            LabelStyle::Code => self.code().to_string(),
        }
    }
}

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => ($code:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All values in table order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Position of this value in [`Self::ALL`].
            pub fn index(self) -> usize {
                self as usize
            }
        }

        impl Labeled for $name {
            fn code(&self) -> &str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            fn label(&self) -> &str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            /// Accepts either the code or the display label.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                match s {
                    $($code | $label => Ok($name::$variant),)+
                    _ => Err(ValidationError::UnknownValue {
                        field: $field,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

coded_enum! {
    /// Student gender.
    Gender, "gender" {
        Male => ("male", "男"),
        Female => ("female", "女"),
    }
}

coded_enum! {
    /// Academic year cohort.
    ClassYear, "class_status" {
        Freshman => ("freshman", "大一"),
        Sophomore => ("sophomore", "大二"),
        Junior => ("junior", "大三"),
        Senior => ("senior", "大四"),
    }
}

coded_enum! {
    /// Whether a student has reported back to campus.
    ReturnStatus, "return_status" {
        Returned => ("returned", "已返校"),
        NotReturned => ("not_returned", "未返校"),
        Delayed => ("delayed", "延期返校"),
    }
}

coded_enum! {
    /// Mode of transport, recorded only for returned students.
    ReturnMethod, "return_method" {
        Train => ("train", "火车"),
        Plane => ("plane", "飞机"),
        Bus => ("bus", "汽车"),
        PrivateCar => ("private_car", "私家车"),
        Other => ("other", "其他"),
    }
}

/// Field of study.
///
/// The six known majors have fixed codes and labels. Any other code found in
/// the data is kept verbatim in [`Major::Other`] and shown as-is, so records
/// with an unexpected major still appear in the per-major tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Major {
    Computer,
    Electronics,
    Mechanical,
    Civil,
    Business,
    Medicine,
    Other(String),
}

impl Major {
    /// The known majors in table order.
    pub const KNOWN: [Major; 6] = [
        Major::Computer,
        Major::Electronics,
        Major::Mechanical,
        Major::Civil,
        Major::Business,
        Major::Medicine,
    ];

    /// Position among the known majors, `None` for [`Major::Other`].
    pub fn known_index(&self) -> Option<usize> {
        Self::KNOWN.iter().position(|m| m == self)
    }

    fn lookup(s: &str) -> Option<Major> {
        match s {
            "computer" | "计算机科学与技术" => Some(Major::Computer),
            "electronics" | "电子信息工程" => Some(Major::Electronics),
            "mechanical" | "机械工程" => Some(Major::Mechanical),
            "civil" | "土木工程" => Some(Major::Civil),
            "business" | "工商管理" => Some(Major::Business),
            "medicine" | "临床医学" => Some(Major::Medicine),
            _ => None,
        }
    }
}

impl Labeled for Major {
    fn code(&self) -> &str {
        match self {
            Major::Computer => "computer",
            Major::Electronics => "electronics",
            Major::Mechanical => "mechanical",
            Major::Civil => "civil",
            Major::Business => "business",
            Major::Medicine => "medicine",
            Major::Other(raw) => raw,
        }
    }

    fn label(&self) -> &str {
        match self {
            Major::Computer => "计算机科学与技术",
            Major::Electronics => "电子信息工程",
            Major::Mechanical => "机械工程",
            Major::Civil => "土木工程",
            Major::Business => "工商管理",
            Major::Medicine => "临床医学",
            Major::Other(raw) => raw,
        }
    }
}

impl FromStr for Major {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "major" });
        }
        Ok(Major::lookup(s).unwrap_or_else(|| Major::Other(s.to_string())))
    }
}

impl From<String> for Major {
    fn from(s: String) -> Self {
        Major::lookup(s.trim()).unwrap_or(Major::Other(s))
    }
}

impl From<Major> for String {
    fn from(m: Major) -> Self {
        m.code().to_string()
    }
}

impl fmt::Display for Major {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row per student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Unique student number.
    pub student_id: String,
    pub name: String,
    pub gender: Gender,
    pub class_year: ClassYear,
    pub major: Major,
    pub return_status: ReturnStatus,
    /// Set only when `return_status` is `Returned`.
    pub return_time: Option<NaiveDateTime>,
    /// Set only when `return_status` is `Returned`.
    pub return_method: Option<ReturnMethod>,
    pub contact: String,
    pub remarks: String,
}

impl StudentRecord {
    pub fn is_returned(&self) -> bool {
        self.return_status == ReturnStatus::Returned
    }

    /// Clears `return_time` and `return_method` on records that are not
    /// returned. Returns `true` if anything was cleared.
    pub fn normalize(&mut self) -> bool {
        if self.is_returned() {
            return false;
        }
        let changed = self.return_time.is_some() || self.return_method.is_some();
        self.return_time = None;
        self.return_method = None;
        changed
    }

    /// Checks the fields a store relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.student_id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "student_id",
            });
        }
        Ok(())
    }

    /// Calendar date of the return, if any.
    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_time.map(|t| t.date())
    }
}

/// Parse a return timestamp in any of the accepted layouts.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM` and a bare
/// `YYYY-MM-DD`, which maps to midnight.
pub fn parse_return_time(s: &str) -> Result<NaiveDateTime, ValidationError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDate::parse_from_str(s, DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|_| ValidationError::InvalidTimestamp(s.to_string()))
}

/// Parse a `YYYY-MM-DD` date, naming `field` in the error.
pub fn parse_date(field: &'static str, s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        field,
        value: s.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(
        id: &str,
        class_year: ClassYear,
        major: Major,
        status: ReturnStatus,
    ) -> StudentRecord {
        StudentRecord {
            student_id: id.to_string(),
            name: format!("学生{}", id),
            gender: Gender::Male,
            class_year,
            major,
            return_status: status,
            return_time: None,
            return_method: None,
            contact: "13800000000".to_string(),
            remarks: String::new(),
        }
    }

    #[test]
    fn test_enum_order_and_index() {
        assert_eq!(ClassYear::ALL.len(), 4);
        assert_eq!(ClassYear::Senior.index(), 3);
        assert_eq!(ReturnMethod::PrivateCar.index(), 3);
        assert_eq!(ReturnStatus::Delayed.index(), 2);
        assert!(ClassYear::Freshman < ClassYear::Senior);
    }

    #[test]
    fn test_parse_code_or_label() {
        assert_eq!("freshman".parse::<ClassYear>(), Ok(ClassYear::Freshman));
        assert_eq!("大四".parse::<ClassYear>(), Ok(ClassYear::Senior));
        assert_eq!(" 私家车 ".parse::<ReturnMethod>(), Ok(ReturnMethod::PrivateCar));
        assert_eq!("延期返校".parse::<ReturnStatus>(), Ok(ReturnStatus::Delayed));

        let err = "graduate".parse::<ClassYear>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownValue {
                field: "class_status",
                value: "graduate".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_major_passthrough() {
        let m: Major = "astronomy".parse().unwrap();
        assert_eq!(m, Major::Other("astronomy".to_string()));
        assert_eq!(m.label(), "astronomy");
        assert_eq!(m.known_index(), None);
        assert!(Major::Medicine < m);

        assert_eq!("临床医学".parse::<Major>(), Ok(Major::Medicine));
        assert!("  ".parse::<Major>().is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&ReturnMethod::PrivateCar).unwrap();
        assert_eq!(json, "\"private_car\"");
        let json = serde_json::to_string(&Major::Civil).unwrap();
        assert_eq!(json, "\"civil\"");
        let back: Major = serde_json::from_str("\"robotics\"").unwrap();
        assert_eq!(back, Major::Other("robotics".to_string()));
    }

    #[test]
    fn test_label_style() {
        assert_eq!(Gender::Female.text(LabelStyle::Display), "女");
        assert_eq!(Gender::Female.text(LabelStyle::Code), "female");
    }

    #[test]
    fn test_normalize_clears_return_fields() {
        let mut r = record("1", ClassYear::Junior, Major::Civil, ReturnStatus::Delayed);
        r.return_method = Some(ReturnMethod::Bus);
        r.return_time = Some(parse_return_time("2024-02-01 10:00:00").unwrap());
        assert!(r.normalize());
        assert_eq!(r.return_method, None);
        assert_eq!(r.return_time, None);

        let mut returned = record("2", ClassYear::Junior, Major::Civil, ReturnStatus::Returned);
        returned.return_method = Some(ReturnMethod::Train);
        assert!(!returned.normalize());
        assert_eq!(returned.return_method, Some(ReturnMethod::Train));
    }

    #[test]
    fn test_parse_return_time_formats() {
        let full = parse_return_time("2024-02-01 08:30:15").unwrap();
        assert_eq!(full.format(TIMESTAMP_FORMAT).to_string(), "2024-02-01 08:30:15");

        let form = parse_return_time("2024-02-01T08:30").unwrap();
        assert_eq!(form.format(TIMESTAMP_FORMAT).to_string(), "2024-02-01 08:30:00");

        let day = parse_return_time("2024-02-01").unwrap();
        assert_eq!(day.format(TIMESTAMP_FORMAT).to_string(), "2024-02-01 00:00:00");

        assert!(parse_return_time("yesterday").is_err());
    }

    #[test]
    fn test_validate_requires_id() {
        let r = record(" ", ClassYear::Junior, Major::Civil, ReturnStatus::Delayed);
        assert!(r.validate().is_err());
    }
}
