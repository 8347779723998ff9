//! Markdown and JSON report generation.
//!
//! The Markdown report renders every table of a [`DashboardBundle`] in
//! bundle order; the JSON report is the bundle itself.

use crate::analysis::{
    ClassMajorRateMatrix, CountSeries, DashboardBundle, MethodClassMatrix, RateSeries,
    StatusSeries,
};
use crate::models::{Gender, LabelStyle, Labeled, ReturnStatus, DATE_FORMAT};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};

/// Context printed above the tables.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub generated_at: DateTime<Local>,
    /// Where the records came from (store path or CSV file).
    pub source: String,
    /// Human summary of the active filter.
    pub filter: String,
    pub today: NaiveDate,
    pub label_style: LabelStyle,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(bundle: &DashboardBundle, meta: &ReportMeta) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", meta.title));
    output.push_str(&generate_metadata_section(bundle, meta));
    output.push_str(&generate_summary_section(bundle, meta.label_style));

    output.push_str(&status_series_section(
        "By Class Year",
        "Class",
        &bundle.class_status_data,
        meta.label_style,
    ));
    output.push_str(&rate_series_section(
        "Return Rate by Class Year",
        "Class",
        &bundle.class_return_rate_data,
    ));
    output.push_str(&status_series_section(
        "By Major",
        "Major",
        &bundle.major_data,
        meta.label_style,
    ));
    output.push_str(&rate_series_section(
        "Return Rate by Major",
        "Major",
        &bundle.major_return_rate_data,
    ));
    output.push_str(&generate_gender_section(bundle, meta.label_style));
    output.push_str(&count_series_section(
        "Return Methods",
        "Method",
        "Returned",
        &bundle.return_method_data,
    ));
    output.push_str(&count_series_section(
        "Daily Returns",
        "Date",
        "Returned",
        &bundle.daily_return_data,
    ));
    output.push_str(&count_series_section(
        "Return Time of Day",
        "Window",
        "Returned",
        &bundle.return_time_distribution_data,
    ));
    output.push_str(&class_major_section(&bundle.class_major_return_rate_data));
    output.push_str(&method_class_section(&bundle.method_class_data));

    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Report generated by returnboard v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

/// Generate a JSON report.
pub fn generate_json_report(bundle: &DashboardBundle) -> Result<String> {
    serde_json::to_string_pretty(bundle).map_err(Into::into)
}

fn generate_metadata_section(bundle: &DashboardBundle, meta: &ReportMeta) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    section.push_str(&format!("- **Source:** `{}`\n", meta.source));
    section.push_str(&format!("- **Filter:** {}\n", meta.filter));
    section.push_str(&format!(
        "- **Trend Window Ends:** {}\n",
        meta.today.format(DATE_FORMAT)
    ));
    section.push_str(&format!("- **Students:** {}\n\n", bundle.total_students));

    section
}

fn generate_summary_section(bundle: &DashboardBundle, style: LabelStyle) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    let headers: Vec<String> = ReturnStatus::ALL.iter().map(|s| s.text(style)).collect();
    section.push_str(&format!("| | {} | **Total** |\n", headers.join(" | ")));
    section.push_str("|:---|---:|---:|---:|---:|\n");

    let counts: Vec<String> = ReturnStatus::ALL
        .iter()
        .map(|&s| bundle.return_status_data.get(s).to_string())
        .collect();
    section.push_str(&format!(
        "| Students | {} | **{}** |\n",
        counts.join(" | "),
        bundle.total_students
    ));
    section.push_str(&format!(
        "| Rate | {:.2}% | {:.2}% | {:.2}% | |\n\n",
        bundle.return_rate, bundle.not_return_rate, bundle.delayed_rate
    ));

    section
}

fn generate_gender_section(bundle: &DashboardBundle, style: LabelStyle) -> String {
    let mut section = String::new();

    section.push_str("## By Gender\n\n");

    let headers: Vec<String> = ReturnStatus::ALL.iter().map(|s| s.text(style)).collect();
    section.push_str(&format!("| Gender | {} | **Total** |\n", headers.join(" | ")));
    section.push_str("|:---|---:|---:|---:|---:|\n");

    for &gender in Gender::ALL {
        let counts = bundle.gender_return_status_data.get(gender);
        let cells: Vec<String> = ReturnStatus::ALL
            .iter()
            .map(|&s| counts.get(s).to_string())
            .collect();
        section.push_str(&format!(
            "| {} | {} | **{}** |\n",
            gender.text(style),
            cells.join(" | "),
            bundle.gender_data.get(gender)
        ));
    }
    section.push('\n');

    section
}

fn status_series_section(
    heading: &str,
    first_col: &str,
    series: &StatusSeries,
    style: LabelStyle,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", heading));
    if series.labels.is_empty() {
        section.push_str("_No records._\n\n");
        return section;
    }

    let headers: Vec<String> = ReturnStatus::ALL.iter().map(|s| s.text(style)).collect();
    section.push_str(&format!(
        "| {} | {} | **Total** |\n",
        first_col,
        headers.join(" | ")
    ));
    section.push_str("|:---|---:|---:|---:|---:|\n");

    for (i, label) in series.labels.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | **{}** |\n",
            label, series.returned[i], series.not_returned[i], series.delayed[i], series.total[i]
        ));
    }
    section.push_str(&format!(
        "| **Total** | {} | {} | {} | **{}** |\n\n",
        series.returned.iter().sum::<usize>(),
        series.not_returned.iter().sum::<usize>(),
        series.delayed.iter().sum::<usize>(),
        series.grand_total()
    ));

    section
}

fn rate_series_section(heading: &str, first_col: &str, series: &RateSeries) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", heading));
    if series.labels.is_empty() {
        section.push_str("_No records._\n\n");
        return section;
    }

    section.push_str(&format!("| {} | Returned | Total | Rate |\n", first_col));
    section.push_str("|:---|---:|---:|---:|\n");
    for (i, label) in series.labels.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2}% |\n",
            label, series.returned[i], series.total[i], series.rates[i]
        ));
    }
    section.push('\n');

    section
}

fn count_series_section(
    heading: &str,
    first_col: &str,
    value_col: &str,
    series: &CountSeries,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", heading));
    section.push_str(&format!("| {} | {} |\n", first_col, value_col));
    section.push_str("|:---|---:|\n");
    for (label, count) in series.labels.iter().zip(&series.data) {
        section.push_str(&format!("| {} | {} |\n", label, count));
    }
    section.push_str(&format!("| **Total** | **{}** |\n\n", series.total()));

    section
}

fn class_major_section(matrix: &ClassMajorRateMatrix) -> String {
    let mut section = String::new();

    section.push_str("## Return Rate by Major and Class Year\n\n");
    section.push_str(&table_header("Major", &matrix.class_labels));
    for (label, row) in matrix.major_labels.iter().zip(&matrix.data) {
        let cells: Vec<String> = row.iter().map(|rate| format!("{:.2}%", rate)).collect();
        section.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
    }
    section.push('\n');

    section
}

fn method_class_section(matrix: &MethodClassMatrix) -> String {
    let mut section = String::new();

    section.push_str("## Return Methods by Class Year\n\n");
    section.push_str(&table_header("Method", &matrix.class_labels));
    for (label, row) in matrix.method_labels.iter().zip(&matrix.data) {
        let cells: Vec<String> = row.iter().map(|n| n.to_string()).collect();
        section.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
    }
    section.push('\n');

    section
}

fn table_header(first_col: &str, columns: &[String]) -> String {
    let mut header = format!("| {} | {} |\n|:---|", first_col, columns.join(" | "));
    for _ in columns {
        header.push_str("---:|");
    }
    header.push('\n');
    header
}
