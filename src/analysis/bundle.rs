//! Chart-ready output shapes.
//!
//! Field names match the keys the dashboard front end binds to, so the JSON
//! form of [`DashboardBundle`] can be served as-is.

use crate::models::{Gender, ReturnStatus};
use serde::{Deserialize, Serialize};

/// Count per return status. Every bucket is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub returned: usize,
    pub not_returned: usize,
    pub delayed: usize,
}

impl StatusCounts {
    pub fn from_array(counts: [usize; 3]) -> Self {
        Self {
            returned: counts[ReturnStatus::Returned.index()],
            not_returned: counts[ReturnStatus::NotReturned.index()],
            delayed: counts[ReturnStatus::Delayed.index()],
        }
    }

    pub fn get(&self, status: ReturnStatus) -> usize {
        match status {
            ReturnStatus::Returned => self.returned,
            ReturnStatus::NotReturned => self.not_returned,
            ReturnStatus::Delayed => self.delayed,
        }
    }

    pub fn total(&self) -> usize {
        self.returned + self.not_returned + self.delayed
    }
}

/// Count per gender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderCounts {
    pub male: usize,
    pub female: usize,
}

impl GenderCounts {
    pub fn get(&self, gender: Gender) -> usize {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
        }
    }
}

/// Labels with a total and one status breakdown per label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSeries {
    pub labels: Vec<String>,
    pub total: Vec<usize>,
    pub returned: Vec<usize>,
    pub not_returned: Vec<usize>,
    pub delayed: Vec<usize>,
}

impl StatusSeries {
    pub fn push(&mut self, label: String, counts: StatusCounts) {
        self.labels.push(label);
        self.total.push(counts.total());
        self.returned.push(counts.returned);
        self.not_returned.push(counts.not_returned);
        self.delayed.push(counts.delayed);
    }

    /// Records over every label.
    pub fn grand_total(&self) -> usize {
        self.total.iter().sum()
    }
}

/// Labels with one value per label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSeries {
    pub labels: Vec<String>,
    pub data: Vec<usize>,
}

impl CountSeries {
    pub fn total(&self) -> usize {
        self.data.iter().sum()
    }
}

/// Return rate per label, with the counts it was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSeries {
    pub labels: Vec<String>,
    pub rates: Vec<f64>,
    pub total: Vec<usize>,
    pub returned: Vec<usize>,
}

/// Gender x status cross tabulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderStatusTable {
    pub male: StatusCounts,
    pub female: StatusCounts,
}

impl GenderStatusTable {
    pub fn get(&self, gender: Gender) -> &StatusCounts {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }
}

/// Return rate per (major, class year). Rows are majors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMajorRateMatrix {
    pub class_labels: Vec<String>,
    pub major_labels: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

/// Returned count per (method, class year). Rows are methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodClassMatrix {
    pub class_labels: Vec<String>,
    pub method_labels: Vec<String>,
    pub data: Vec<Vec<usize>>,
}

/// Every table the dashboard renders, computed from one filtered snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardBundle {
    pub total_students: usize,
    pub return_status_data: StatusCounts,
    pub class_status_data: StatusSeries,
    pub major_data: StatusSeries,
    pub return_method_data: CountSeries,
    pub daily_return_data: CountSeries,
    pub gender_data: GenderCounts,
    pub return_rate: f64,
    pub not_return_rate: f64,
    pub delayed_rate: f64,
    pub major_return_rate_data: RateSeries,
    pub class_return_rate_data: RateSeries,
    pub gender_return_status_data: GenderStatusTable,
    pub return_time_distribution_data: CountSeries,
    pub class_major_return_rate_data: ClassMajorRateMatrix,
    pub method_class_data: MethodClassMatrix,
}
