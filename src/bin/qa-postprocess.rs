use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use mmeval_prep::app::qa_extract_use_case::{DuplicatePolicy, QaExtractUseCase};
use mmeval_prep::config::PrepConfig;
use mmeval_prep::infra::failure_sink::TracingFailureSink;
use mmeval_prep::infra::{csv_io, json_io};
use mmeval_prep::observability::{init_logging, metrics};
use mmeval_prep::pipeline::QaScanner;

/// Extract question/answer pairs from generated responses and join them
/// with image descriptions.
#[derive(Parser, Debug)]
#[command(name = "qa-postprocess", version, about = "Postprocess CSV with metadata")]
struct Cli {
    /// Path to the input CSV file
    #[arg(long = "input_csv")]
    input_csv: PathBuf,

    /// Path to the metadata JSON file
    #[arg(long = "metadata_json")]
    metadata_json: PathBuf,

    /// Path to the output JSON file
    #[arg(long = "output_json")]
    output_json: PathBuf,

    /// How to treat repeated IDs [default: last-write-wins]
    #[arg(long = "duplicate_policy", value_enum)]
    duplicate_policy: Option<DuplicatePolicy>,

    /// Token that precedes the model's answer [default: assistant]
    #[arg(long = "marker_token")]
    marker_token: Option<String>,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a Prometheus metrics snapshot here when the run ends
    #[arg(long = "metrics_out")]
    metrics_out: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<()> {
    let config = PrepConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let qa_config = config.qa;

    let metadata = json_io::load_metadata(&cli.metadata_json)
        .with_context(|| format!("Error loading metadata file {}", cli.metadata_json.display()))?;
    let rows = csv_io::read_generated_rows(&cli.input_csv)
        .with_context(|| format!("Error reading {}", cli.input_csv.display()))?;

    let marker = cli.marker_token.clone().unwrap_or(qa_config.marker_token);
    let use_case = QaExtractUseCase::new(Arc::new(TracingFailureSink))
        .with_scanner(QaScanner::new(marker))
        .with_missing_description(qa_config.missing_description)
        .with_duplicate_policy(cli.duplicate_policy.unwrap_or(qa_config.duplicate_policy));

    let processed = use_case.run(rows, &metadata).context("Error processing the file")?;

    json_io::write_json_pretty(&cli.output_json, &processed)
        .with_context(|| format!("Failed to write {}", cli.output_json.display()))?;
    info!("Processed data saved to {}", cli.output_json.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging("qa-postprocess");
    if cli.metrics_out.is_some() {
        metrics::init().map_err(|e| anyhow!("{}", e))?;
    }

    let result = run(&cli);
    if let Err(e) = &result {
        error!("{:#}", e);
    }

    if let Some(path) = &cli.metrics_out {
        metrics::write_snapshot(path).with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }
    result
}
