//! ReturnBoard - student return-to-campus reporting
//!
//! A CLI tool that aggregates student return records into dashboard
//! tables and moves records between CSV or spreadsheet files and a SQLite
//! store.
//!
//! Exit codes:
//!   0 - Success (rate at or above threshold, or no --min-return-rate set)
//!   1 - Runtime or validation error (bad filter, unreadable file, etc.)
//!   2 - Return rate below --min-return-rate

mod analysis;
mod cli;
mod config;
mod error;
mod exchange;
mod filter;
mod generate;
mod models;
mod report;
mod store;

use anyhow::{Context, Result};
use chrono::Local;
use cli::{Args, Command, ExportArgs, GenerateArgs, ImportArgs, OutputFormat, ReportArgs};
use config::{Config, CONFIG_FILE};
use exchange::{ImportOptions, ParsedFile};
use filter::ReportFilter;
use indicatif::{ProgressBar, ProgressStyle};
use models::parse_date;
use std::io::Write;
use std::path::Path;
use store::{MemoryStore, RecordStore, SqliteStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes first: it can raise the log level.
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    debug!("ReturnBoard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Config: {}", origin);
    debug!("Arguments: {:?}", args);

    match run(&config, &args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .returnboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the store path, report format, and a default filter.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the subcommand. Returns the process exit code.
fn run(config: &Config, args: &Args) -> Result<i32> {
    match &args.command {
        Some(Command::Report(report)) => run_report(config, report),
        Some(Command::Import(import)) => run_import(config, import, args.quiet),
        Some(Command::Export(export)) => run_export(config, export, args.quiet),
        Some(Command::Generate(generate)) => run_generate(config, generate, args.quiet),
        None => Ok(0),
    }
}

/// Compute the bundle and write it. Returns 2 when the return rate is below
/// `--min-return-rate`.
fn run_report(config: &Config, args: &ReportArgs) -> Result<i32> {
    let filter = ReportFilter::parse(&config.filter).context("Invalid filter")?;
    info!("Filter: {}", filter.describe());

    let today = match args.today.as_deref() {
        Some(day) => parse_date("today", day)?,
        None => Local::now().date_naive(),
    };

    let options = analysis::AggregateOptions {
        today,
        label_style: config.report.label_style,
    };

    let (bundle, source) = match args.input {
        Some(ref input) => {
            let parsed = exchange::read_file(input, import_options(config))?;

            // Same id collapsing as an import into the store.
            let mut memory = MemoryStore::new();
            exchange::store_parsed(&mut memory, parsed, &ProgressBar::hidden())?;
            (
                analysis::aggregate(memory.records(), &filter, options),
                input.display().to_string(),
            )
        }
        None => {
            let store = open_store(config)?;
            let records = store.fetch(&filter)?;
            debug!("{} records matched", records.len());
            (
                analysis::summarize(&records, options),
                config.store.path.display().to_string(),
            )
        }
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&bundle)?,
        OutputFormat::Markdown => report::generate_markdown_report(
            &bundle,
            &report::ReportMeta {
                title: config.report.title.clone(),
                generated_at: Local::now(),
                source,
                filter: filter.describe(),
                today,
                label_style: config.report.label_style,
            },
        ),
    };

    match config.output_path() {
        Some(path) => {
            std::fs::write(&path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(
                "Report saved to {} ({} students, return rate {:.2}%)",
                path.display(),
                bundle.total_students,
                bundle.return_rate
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .context("Failed to write report to stdout")?;
            stdout.flush()?;
        }
    }

    if let Some(threshold) = args.min_return_rate {
        if bundle.return_rate < threshold {
            eprintln!(
                "\n⛔ Return rate {:.2}% is below {:.2}%. Failing (exit code 2).",
                bundle.return_rate, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

fn run_import(config: &Config, args: &ImportArgs, quiet: bool) -> Result<i32> {
    let mut store = open_store(config)?;
    let progress = progress_bar(quiet);

    let summary = exchange::import_file(&mut store, &args.file, import_options(config), &progress)?;
    progress.finish_and_clear();

    if !quiet {
        println!("📥 Imported {}", args.file.display());
        println!(
            "   New: {} | Updated: {} | Skipped: {}",
            summary.inserted, summary.updated, summary.skipped
        );
        println!("   Store now holds {} records", store.len()?);
    }
    Ok(0)
}

fn run_export(config: &Config, args: &ExportArgs, quiet: bool) -> Result<i32> {
    let store = open_store(config)?;

    match args.output {
        Some(ref path) => {
            let written = exchange::export_file(&store, path)?;
            if !quiet {
                println!("📤 Exported {} records to {}", written, path.display());
            }
        }
        None => {
            let records = store.all()?;
            exchange::write_records(std::io::stdout().lock(), &records)
                .context("Failed to write records to stdout")?;
        }
    }
    Ok(0)
}

fn run_generate(config: &Config, args: &GenerateArgs, quiet: bool) -> Result<i32> {
    let records = generate::generate(generate::GenerateOptions {
        count: args.count,
        seed: args.seed,
        now: Local::now().naive_local(),
    });
    info!("Generated {} records", records.len());

    if let Some(ref path) = args.output {
        let written = exchange::write_file(path, &records)?;
        if !quiet {
            println!("🎲 Wrote {} random records to {}", written, path.display());
        }
        return Ok(0);
    }

    let mut store = open_store(config)?;
    let previous = store.len()?;
    if previous > 0 {
        warn!("Replacing {} existing records", previous);
    }
    store.clear()?;

    let progress = progress_bar(quiet);
    let summary = exchange::store_parsed(
        &mut store,
        ParsedFile {
            records,
            skipped: 0,
        },
        &progress,
    )?;
    progress.finish_and_clear();

    if !quiet {
        println!(
            "🎲 Stored {} random records in {}",
            summary.stored(),
            config.store.path.display()
        );
    }
    Ok(0)
}

fn import_options(config: &Config) -> ImportOptions {
    ImportOptions {
        strict: config.import.strict,
    }
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(&config.store.path)
}

/// Bulk-write progress bar; hidden in quiet mode.
fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Load configuration from file or use defaults. Runs before logging is
/// set up, so it reports where the config came from instead of logging it.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, config_path.display().to_string()));
    }

    // Try default location
    match Config::load_from_dir(Path::new(".")) {
        Ok(Some(config)) => Ok((config, CONFIG_FILE.to_string())),
        Ok(None) => Ok((Config::default(), "defaults".to_string())),
        Err(e) => {
            eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
            Ok((Config::default(), "defaults".to_string()))
        }
    }
}
