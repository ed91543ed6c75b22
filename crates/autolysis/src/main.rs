//! CLI entry point for the analysis pipeline.

use anyhow::{Context, Result};
use autolysis::ai::{
    ChatCompletionsConfig, ChatCompletionsProvider, DEFAULT_BASE_URL, DEFAULT_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
use autolysis::config::DEFAULT_CREDENTIAL_ENV;
use autolysis::{AnalysisError, AnalysisPipeline, AnalysisReport, ReportAssembler, ReportConfig};
use clap::Parser;
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Automated dataset analysis with an LLM-written README",
    long_about = "Profiles a CSV dataset, renders charts, ranks features against a \
                  'target' column and asks an LLM to write README.md. The report and \
                  charts are moved into the folder containing the dataset.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  AIPROXY_TOKEN    Bearer token for the chat-completions endpoint (required)\n\n\
                  EXAMPLES:\n  \
                  autolysis data/sales.csv\n\n  \
                  # Different model, label column named 'price'\n  \
                  autolysis data/homes.csv --model gpt-4o --target price"
)]
struct Args {
    /// Path to the CSV dataset
    filepath: PathBuf,

    /// Chat-completions model
    #[arg(long, env = "AUTOLYSIS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Chat-completions endpoint URL
    #[arg(long, env = "AUTOLYSIS_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Narrative request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Label column for feature importance
    #[arg(short, long, default_value = autolysis::config::DEFAULT_TARGET_COLUMN)]
    target: String,

    /// Directory where files are generated before being moved
    #[arg(short, long, default_value = ".")]
    work_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,

    /// Print the run summary as JSON to stdout instead of logging
    #[arg(long)]
    json: bool,

    /// Write a JSON summary of the run next to the report
    ///
    /// The summary is saved as <dataset_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// Logging is disabled entirely for `--json` so stdout only carries JSON.
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

fn main() -> ExitCode {
    // .env has to be loaded before clap reads env-backed options
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e);
            ExitCode::FAILURE
        }
    }
}

/// Print a category-specific message for a fatal error.
fn report_failure(err: &anyhow::Error) {
    error!("{:#}", err);
    match err.downcast_ref::<AnalysisError>() {
        Some(e) if e.is_file_error() => eprintln!("File Error: {}", e),
        Some(e) if e.is_permission_error() => eprintln!("Permission Error: {}", e),
        Some(e) => eprintln!("Unexpected error occurred: {}", e),
        None => eprintln!("Unexpected error occurred: {:#}", err),
    }
}

fn read_credential() -> Result<String, AnalysisError> {
    std::env::var(DEFAULT_CREDENTIAL_ENV)
        .ok()
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AnalysisError::MissingCredential(DEFAULT_CREDENTIAL_ENV.to_string()))
}

fn run(args: &Args) -> Result<()> {
    let token = read_credential()?;

    let config = ReportConfig::builder()
        .work_dir(&args.work_dir)
        .target_column(&args.target)
        .build()
        .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;

    let provider_config = ChatCompletionsConfig::builder()
        .model(&args.model)
        .base_url(&args.api_url)
        .timeout_secs(args.timeout_secs)
        .build()
        .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
    let provider = Arc::new(ChatCompletionsProvider::with_config(token, provider_config)?);

    let pipeline = AnalysisPipeline::builder()
        .config(config)
        .provider(provider)
        .build()?;

    info!("{}", "=".repeat(80));
    info!("Starting automated analysis...");
    info!("{}", "=".repeat(80));

    let report = pipeline.run(&args.filepath)?;
    handle_output(&report, args)
}

/// Output behavior:
/// - Default: human-readable summary
/// - `--json`: JSON summary on stdout only
/// - `--emit-report`: JSON summary written next to the report
fn handle_output(report: &AnalysisReport, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if args.emit_report {
        let path = report
            .output_dir
            .join(format!("{}_report.json", file_stem(&args.filepath)));
        ReportAssembler::write_json(report, &path)
            .with_context(|| format!("Writing {}", path.display()))?;
    }

    print_summary(report);
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

/// User-facing summary, printed regardless of log level.
fn print_summary(report: &AnalysisReport) {
    let (rows, cols) = report.profile.shape;
    println!("\n{}", "=".repeat(60));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Dataset:  {}", report.input.display());
    println!("  Shape:    {} rows x {} columns", rows, cols);
    println!("  Numeric:  {}", report.profile.numeric_columns().len());
    println!("  Missing:  {}", report.profile.total_missing());

    if let Some(ranking) = &report.feature_importance {
        println!("\n  Top features:");
        for entry in ranking.entries.iter().take(5) {
            println!("    {:<24} {:.4}", entry.feature, entry.importance);
        }
    }

    println!("\n  Files in {}:", report.output_dir.display());
    for artifact in &report.artifacts {
        println!("    {}", artifact.name);
    }
    println!("{}", "=".repeat(60));
}
