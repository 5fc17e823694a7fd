use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use mmeval_prep::app::merge_use_case::MergeUseCase;
use mmeval_prep::app::ports::ImageSourcePort;
use mmeval_prep::config::{resolve_against_metadata_dir, PrepConfig};
use mmeval_prep::infra::failure_sink::TracingFailureSink;
use mmeval_prep::infra::hf_dataset::HuggingFaceImageSource;
use mmeval_prep::infra::image_store::FsImageStore;
use mmeval_prep::infra::json_io;
use mmeval_prep::infra::parquet_images::LocalParquetImageSource;
use mmeval_prep::observability::{init_logging, metrics};
use mmeval_prep::pipeline::OutputCoverage;

/// Join annotation metadata with the image dataset and write the merged
/// metadata file, optionally saving the images as JPEG.
#[derive(Parser, Debug)]
#[command(name = "qa-preprocess", version, about = "Process and save images and metadata")]
struct Cli {
    /// Hugging Face dataset name [default: vector-institute/newsmediabias-plus-clean]
    #[arg(long = "dataset_name")]
    dataset_name: Option<String>,

    /// Path to the metadata JSON file
    #[arg(long = "metadata_json_path")]
    metadata_json_path: PathBuf,

    /// Output directory for processed images, relative to the metadata file
    #[arg(long = "output_dir")]
    output_dir: PathBuf,

    /// Output path for processed metadata JSON, relative to the metadata file
    #[arg(long = "output_json_path")]
    output_json_path: PathBuf,

    /// Dataset split to read [default: train]
    #[arg(long)]
    split: Option<String>,

    /// Read images from local parquet file(s) instead of the hub
    #[arg(long = "dataset_parquet")]
    dataset_parquet: Option<PathBuf>,

    /// Write each matched image to <output_dir>/<id>.jpg
    #[arg(long = "save_images")]
    save_images: bool,

    /// Only emit entries whose id matched an image
    #[arg(long = "matched_only")]
    matched_only: bool,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a Prometheus metrics snapshot here when the run ends
    #[arg(long = "metrics_out")]
    metrics_out: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<()> {
    let config = PrepConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut merge_config = config.merge;
    if let Some(name) = &cli.dataset_name {
        merge_config.dataset_name = name.clone();
    }
    if let Some(split) = &cli.split {
        merge_config.split = split.clone();
    }

    let output_dir = resolve_against_metadata_dir(&cli.metadata_json_path, &cli.output_dir);
    let output_json_path = resolve_against_metadata_dir(&cli.metadata_json_path, &cli.output_json_path);

    let source: Box<dyn ImageSourcePort> = match &cli.dataset_parquet {
        Some(path) => Box::new(LocalParquetImageSource::new(path.clone(), merge_config.columns())),
        None => {
            let mut hub = HuggingFaceImageSource::new(
                merge_config.dataset_name.clone(),
                merge_config.split.clone(),
                merge_config.columns(),
            );
            hub.revision = merge_config.revision.clone();
            hub.token = merge_config.hf_token();
            hub.cache_dir = merge_config.cache_dir.clone();
            Box::new(hub)
        }
    };

    let metadata = json_io::load_metadata(&cli.metadata_json_path)
        .with_context(|| format!("Failed to load metadata from {}", cli.metadata_json_path.display()))?;

    let coverage = if cli.matched_only {
        OutputCoverage::MatchedOnly
    } else {
        OutputCoverage::AllMetadata
    };
    let use_case = MergeUseCase::new(source, Box::new(FsImageStore), Arc::new(TracingFailureSink))
        .with_coverage(coverage);

    let records = use_case
        .run(&metadata, &output_dir, cli.save_images)
        .context("Failed to merge metadata with the image dataset")?;

    info!("Saving processed data to {}...", output_json_path.display());
    json_io::write_json_pretty(&output_json_path, &records)
        .with_context(|| format!("Failed to write {}", output_json_path.display()))?;
    info!("Processed data saved to {}.", output_json_path.display());
    Ok(())
}

fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging("qa-preprocess");
    if cli.metrics_out.is_some() {
        metrics::init().map_err(|e| anyhow!("{}", e))?;
    }

    let result = run(&cli);
    if let Err(e) = &result {
        error!("Error processing the dataset: {:#}", e);
    }

    if let Some(path) = &cli.metrics_out {
        metrics::write_snapshot(path).with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }
    result
}
