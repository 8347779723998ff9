//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.returnboard.toml` files.

use crate::cli::{Args, Command, OutputFormat};
use crate::filter::RawFilter;
use crate::models::LabelStyle;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".returnboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Import settings.
    #[serde(default)]
    pub import: ImportConfig,

    /// Default report filter, overridden per dimension by CLI flags.
    #[serde(default)]
    pub filter: RawFilter,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path; empty means stdout.
    #[serde(default)]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("returnboard.sqlite3")
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Display labels or raw codes in tables.
    #[serde(default)]
    pub label_style: LabelStyle,

    /// Markdown report title.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            label_style: LabelStyle::default(),
            title: default_title(),
        }
    }
}

fn default_title() -> String {
    "Student Return Report".to_string()
}

/// CSV import settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Reject files with unknown labels instead of substituting defaults.
    #[serde(default)]
    pub strict: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from `dir/.returnboard.toml`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref db) = args.db {
            self.store.path = db.clone();
        }

        match &args.command {
            Some(Command::Report(report)) => {
                if let Some(format) = report.format {
                    self.report.format = format;
                }
                if let Some(style) = report.label_style {
                    self.report.label_style = style;
                }
                if let Some(ref output) = report.output {
                    self.general.output = output.display().to_string();
                }
                self.filter.overlay(&report.filter.to_raw());
            }
            Some(Command::Import(import)) => {
                if import.strict {
                    self.import.strict = true;
                }
            }
            _ => {}
        }
    }

    /// Log level: `quiet` wins, then `[general] verbose` (also set by
    /// `--verbose`), then INFO.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Output path, `None` for stdout.
    pub fn output_path(&self) -> Option<PathBuf> {
        let output = self.general.output.trim();
        if output.is_empty() || output == "-" {
            None
        } else {
            Some(PathBuf::from(output))
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
