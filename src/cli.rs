//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::filter::RawFilter;
use crate::models::LabelStyle;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ReturnBoard - student return-to-campus reporting
///
/// Aggregate return records into dashboard tables, filter them by date,
/// class year, major and status, and move records in and out as CSV or xlsx.
///
/// Examples:
///   returnboard import students.csv
///   returnboard export --output students.xlsx
///   returnboard report --class-status junior,senior --format json
///   returnboard report --input students.csv --start-date 2024-02-01
///   returnboard generate --count 500 --seed 7
///   returnboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// SQLite record store
    ///
    /// Defaults to the [store] path of the config file.
    #[arg(long, global = true, value_name = "FILE", env = "RETURNBOARD_DB")]
    pub db: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .returnboard.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .returnboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute the dashboard tables
    Report(ReportArgs),
    /// Load a CSV or spreadsheet file into the store
    Import(ImportArgs),
    /// Write the store to CSV or xlsx
    Export(ExportArgs),
    /// Fill the store (or a file) with random records
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Read records from a CSV or spreadsheet file instead of the store
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Last day of the 7-day trend window (default: local date)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub today: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Label style for table rows (display, code)
    #[arg(long, value_name = "STYLE")]
    pub label_style: Option<LabelStyle>,

    /// Output file path for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fail if the filtered return rate is below this percentage
    ///
    /// Useful for CI pipelines. Exit code 2 when the rate is lower.
    #[arg(long, value_name = "PCT")]
    pub min_return_rate: Option<f64>,
}

/// Filter flags. List flags repeat or take comma-separated values, as
/// codes or display labels.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Earliest return date, inclusive
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start_date: Option<String>,

    /// Latest return date, inclusive
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end_date: Option<String>,

    /// Class years to include
    #[arg(long, value_name = "CLASS", value_delimiter = ',')]
    pub class_status: Vec<String>,

    /// Majors to include
    #[arg(long, value_name = "MAJOR", value_delimiter = ',')]
    pub major: Vec<String>,

    /// Return statuses to include
    #[arg(long, value_name = "STATUS", value_delimiter = ',')]
    pub return_status: Vec<String>,
}

impl FilterArgs {
    pub fn to_raw(&self) -> RawFilter {
        RawFilter {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            class_status: self.class_status.clone(),
            major: self.major.clone(),
            return_status: self.return_status.clone(),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    /// CSV or spreadsheet (.xlsx, .xls, .ods) with the standard header
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Abort on the first unrecognized cell
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Destination file, .xlsx for a workbook (default: CSV on stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Number of records
    #[arg(long, default_value = "500", value_name = "COUNT")]
    pub count: usize,

    /// Seed for reproducible data
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Write a CSV or .xlsx file instead of replacing the store contents
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            None => Err("A subcommand is required (report, import, export, generate)".to_string()),
            Some(Command::Report(report)) => {
                if report.input.is_some() && self.db.is_some() {
                    return Err("Cannot use both --input and --db".to_string());
                }
                if let Some(rate) = report.min_return_rate {
                    if !(0.0..=100.0).contains(&rate) {
                        return Err("Minimum return rate must be between 0 and 100".to_string());
                    }
                }
                if let Some(ref input) = report.input {
                    if !input.is_file() {
                        return Err(format!("Input file does not exist: {}", input.display()));
                    }
                }
                Ok(())
            }
            Some(Command::Import(import)) => {
                if !import.file.is_file() {
                    return Err(format!("Import file does not exist: {}", import.file.display()));
                }
                Ok(())
            }
            Some(Command::Export(_)) => Ok(()),
            Some(Command::Generate(generate)) => {
                if generate.count == 0 {
                    return Err("Count must be at least 1".to_string());
                }
                if generate.output.is_some() && self.db.is_some() {
                    return Err("Cannot use both --output and --db".to_string());
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            command: Some(command),
            db: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    fn report() -> ReportArgs {
        ReportArgs::default()
    }

    #[test]
    fn test_parse_report_flags() {
        let args = Args::try_parse_from([
            "returnboard",
            "report",
            "--class-status",
            "junior,大四",
            "--major",
            "civil",
            "--major",
            "business",
            "--start-date",
            "2024-02-01",
            "--format",
            "json",
            "--min-return-rate",
            "75",
        ])
        .unwrap();

        let Some(Command::Report(report)) = args.command else {
            panic!("expected report subcommand");
        };
        assert_eq!(report.format, Some(OutputFormat::Json));
        assert_eq!(report.min_return_rate, Some(75.0));

        let raw = report.filter.to_raw();
        assert_eq!(raw.class_status, vec!["junior", "大四"]);
        assert_eq!(raw.major, vec!["civil", "business"]);
        assert_eq!(raw.start_date.as_deref(), Some("2024-02-01"));
        assert!(raw.return_status.is_empty());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["returnboard", "export", "--db", "x.sqlite3", "-v"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("x.sqlite3")));
        assert!(args.verbose);
        assert!(matches!(args.command, Some(Command::Export(_))));
    }

    #[test]
    fn test_generate_defaults() {
        let args = Args::try_parse_from(["returnboard", "generate"]).unwrap();
        let Some(Command::Generate(generate)) = args.command else {
            panic!("expected generate subcommand");
        };
        assert_eq!(generate.count, 500);
        assert_eq!(generate.seed, None);
    }

    #[test]
    fn test_validation_requires_subcommand() {
        let mut args = make_args(Command::Export(ExportArgs::default()));
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Report(report()));
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rate_range() {
        let mut args = make_args(Command::Report(ReportArgs {
            min_return_rate: Some(120.0),
            ..report()
        }));
        assert!(args.validate().is_err());

        args.command = Some(Command::Report(ReportArgs {
            min_return_rate: Some(80.0),
            ..report()
        }));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_input_and_db() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut args = make_args(Command::Report(ReportArgs {
            input: Some(file.path().to_path_buf()),
            ..report()
        }));
        assert!(args.validate().is_ok());

        args.db = Some(PathBuf::from("store.sqlite3"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_generate_count() {
        let args = make_args(Command::Generate(GenerateArgs {
            count: 0,
            seed: None,
            output: None,
        }));
        assert!(args.validate().is_err());
    }
}
