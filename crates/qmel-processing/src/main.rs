//! CLI entry point for the QMEL notification cleaner.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use qmel_processing::{
    ArtifactMover, DiagnosticReport, Diagnoser, DirectorySink, FsMover, ParsingMode, Pipeline,
    PipelineConfig, PipelineConfigBuilder, PipelineResult, ProcessingError, Schema, TableSink,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// CLI-compatible parsing mode enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliParsingMode {
    /// `|f1|f2|...|f20|` lines; one delimiter stripped at each end
    PipeTable,
    /// SAP list output `| |001 |...|`; selection column and client prefix dropped
    SapList,
}

impl From<CliParsingMode> for ParsingMode {
    fn from(cli: CliParsingMode) -> Self {
        match cli {
            CliParsingMode::PipeTable => ParsingMode::PipeTable,
            CliParsingMode::SapList => ParsingMode::SapList,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cleaning pipeline for SAP maintenance notification (QMEL) dumps",
    long_about = "Parses a pipe-delimited QMEL dump, drops malformed lines, coerces types,\n\
                  removes sparse columns and rows, imputes gaps and writes a clean CSV.\n\n\
                  ENVIRONMENT VARIABLES (also read from .env):\n  \
                  QMEL_INPUT, QMEL_OUTPUT, QMEL_MODE, QMEL_THRESHOLD,\n  \
                  QMEL_ARCHIVE_DIR, QMEL_PROCESSED_DIR, QMEL_PUSH_ROOT, QMEL_POOL, QMEL_TABLE\n\n\
                  EXAMPLES:\n  \
                  # Clean a generic pipe table\n  \
                  qmel-processing run -i raw_data.txt -o cleaned_data.csv\n\n  \
                  # SAP list output, archive the raw file afterwards\n  \
                  qmel-processing run -i raw.txt --mode sap-list --archive-dir unprocessed\n\n  \
                  # Inspect a dump before cleaning it\n  \
                  qmel-processing diagnose -i raw.txt --sample-size 20"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the final JSON document is printed.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean a raw dump and write the CSV
    Run(RunArgs),
    /// Count and sample the lines of a raw dump without changing anything
    Diagnose(DiagnoseArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the raw text dump
    #[arg(short, long, env = "QMEL_INPUT")]
    input: PathBuf,

    /// Path of the cleaned CSV
    #[arg(short, long, env = "QMEL_OUTPUT")]
    output: Option<PathBuf>,

    /// JSON file with pipeline settings; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Line decoration convention of the input
    #[arg(long, value_enum, env = "QMEL_MODE")]
    mode: Option<CliParsingMode>,

    /// Missing fraction (0.0 - 1.0) above which a column or row is dropped
    #[arg(long, env = "QMEL_THRESHOLD")]
    threshold: Option<f64>,

    /// Number of rejected lines kept verbatim in the report
    #[arg(long)]
    sample_size: Option<usize>,

    /// Move the raw input here after a successful run
    #[arg(long, env = "QMEL_ARCHIVE_DIR")]
    archive_dir: Option<PathBuf>,

    /// Move the cleaned CSV here after a successful run
    #[arg(long, env = "QMEL_PROCESSED_DIR")]
    processed_dir: Option<PathBuf>,

    /// Push the cleaned table into pools under this directory
    #[arg(long, env = "QMEL_PUSH_ROOT")]
    push_root: Option<PathBuf>,

    /// Data pool receiving the pushed table
    #[arg(long, env = "QMEL_POOL", default_value = "qmel")]
    pool: String,

    /// Base name of the pushed table; a timestamp is appended
    #[arg(long, env = "QMEL_TABLE", default_value = "Notifications")]
    table: String,

    /// Write the diagnostic report next to the output as <input>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

#[derive(Args, Debug)]
struct DiagnoseArgs {
    /// Path to the raw text dump
    #[arg(short, long, env = "QMEL_INPUT")]
    input: PathBuf,

    /// Line decoration convention of the input
    #[arg(long, value_enum, env = "QMEL_MODE", default_value = "pipe-table")]
    mode: CliParsingMode,

    /// Number of leading and malformed lines to show
    #[arg(long, default_value = "10")]
    sample_size: usize,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // .env must be loaded before parsing so env fallbacks see it
    dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.quiet, cli.json);

    match &cli.command {
        Commands::Run(args) => run(args, &cli),
        Commands::Diagnose(args) => diagnose(args, &cli),
    }
}

/// Merge the optional JSON config file with command line overrides.
fn build_config(args: &RunArgs) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfigBuilder::from_config(base);
    if let Some(output) = &args.output {
        builder = builder.output_path(output);
    }
    if let Some(mode) = args.mode {
        builder = builder.parsing_mode(mode.into());
    }
    if let Some(threshold) = args.threshold {
        builder = builder.threshold(threshold);
    }
    if let Some(size) = args.sample_size {
        builder = builder.sample_size(size);
    }

    Ok(builder.build()?)
}

fn run(args: &RunArgs, cli: &Cli) -> Result<()> {
    let config = build_config(args)?;
    info!("{}", "=".repeat(80));
    info!(
        "Cleaning {} ({} mode, threshold {})",
        args.input.display(),
        config.parsing_mode.display_name(),
        config.threshold
    );
    info!("{}", "=".repeat(80));

    let quiet = cli.quiet || cli.json;
    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(move |update| {
            if !quiet {
                info!(
                    "[{:>3.0}%] {}: {}",
                    update.progress * 100.0,
                    update.stage.display_name(),
                    update.message
                );
            }
        })
        .build()?;

    let mut result = match pipeline.run(&args.input) {
        Ok(result) => result,
        Err(e) => return Err(report_failure(e, cli.json)),
    };

    archive_artifacts(args, &mut result);

    let pushed = match &args.push_root {
        Some(root) => {
            let sink = DirectorySink::new(root);
            match sink.push_table(&args.pool, &args.table, &result.table) {
                Ok(name) => Some(name),
                Err(e) => {
                    // the cleaned CSV stays where it is
                    error!("Pushing to '{}' failed: {}", args.pool, e);
                    if cli.json {
                        print_json(&result, None, Some(&e))?;
                    }
                    return Err(anyhow!(e));
                }
            }
        }
        None => None,
    };

    if args.emit_report {
        let dir = result
            .output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let path = result.report.write_json(&dir, &file_stem(&args.input))?;
        info!("Report written to: {}", path.display());
    }

    if cli.json {
        return print_json(&result, pushed.as_deref(), None);
    }

    print_human_readable_summary(&result, pushed.as_deref());
    Ok(())
}

/// Move the raw input and the cleaned CSV into their archive directories.
/// Failures are logged and do not fail the run.
fn archive_artifacts(args: &RunArgs, result: &mut PipelineResult) {
    let mover = FsMover;

    if let Some(dir) = &args.archive_dir
        && let Err(e) = mover.move_file(&args.input, dir)
    {
        warn!("Could not archive {}: {}", args.input.display(), e);
    }

    if let Some(dir) = &args.processed_dir {
        match mover.move_file(&result.output_path, dir) {
            Ok(dest) => {
                result.output_path = dest.clone();
                result.report.output_path = Some(dest);
            }
            Err(e) => warn!("Could not move {}: {}", result.output_path.display(), e),
        }
    }
}

fn report_failure(e: ProcessingError, json_output: bool) -> anyhow::Error {
    if json_output {
        let doc = json!({ "success": false, "error": &e });
        if let Ok(text) = serde_json::to_string_pretty(&doc) {
            println!("{}", text);
        }
    }

    if e.is_empty_input() {
        warn!("No valid data found; nothing was written");
    } else {
        error!("Pipeline failed: {}", e);
    }
    anyhow!(e)
}

fn print_json(
    result: &PipelineResult,
    pushed_table: Option<&str>,
    push_error: Option<&ProcessingError>,
) -> Result<()> {
    let doc = json!({
        "success": push_error.is_none(),
        "output_path": result.output_path,
        "duration_ms": result.duration_ms,
        "pushed_table": pushed_table,
        "error": push_error,
        "report": &result.report,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&doc).context("Serializing run result")?
    );
    Ok(())
}

/// Print the run summary.
///
/// Uses `println!` on purpose: this is the command's output, not a log line.
fn print_human_readable_summary(result: &PipelineResult, pushed_table: Option<&str>) {
    let report: &DiagnosticReport = &result.report;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    for line in report.summary_lines() {
        println!("  {}", line);
    }
    if !report.rejected_samples.is_empty() {
        println!();
        println!("Rejected lines (first {}):", report.rejected_samples.len());
        for sample in &report.rejected_samples {
            println!(
                "  line {} ({}, {} fields): {}",
                sample.offset + 1,
                sample.reason,
                sample.field_count,
                sample.content
            );
        }
    }
    println!();
    println!("Output: {}", result.output_path.display());
    if let Some(name) = pushed_table {
        println!("Pushed table: {}", name);
    }
    println!("Duration: {}ms", result.duration_ms);
}

fn diagnose(args: &DiagnoseArgs, cli: &Cli) -> Result<()> {
    let diagnoser = Diagnoser::new(Schema::qmel(), args.mode.into(), args.sample_size);
    let report = diagnoser.diagnose_path(&args.input)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in report.summary_lines() {
        println!("{}", line);
    }
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}
