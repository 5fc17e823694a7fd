use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use mmeval_prep::app::caption_flatten_use_case::CaptionFlattenUseCase;
use mmeval_prep::common::constants::{DEFAULT_CAPTIONS_CSV, DEFAULT_CAPTIONS_JSON};
use mmeval_prep::infra::{csv_io, json_io};
use mmeval_prep::observability::init_logging;

/// Convert caption JSON into a flat CSV file.
#[derive(Parser, Debug)]
#[command(name = "captions-to-csv", version, about = "Convert JSON data to CSV format")]
struct Cli {
    /// Path to the input JSON file
    #[arg(long = "json_filename", default_value = DEFAULT_CAPTIONS_JSON)]
    json_filename: PathBuf,

    /// Path to the output CSV file
    #[arg(long = "csv_filename", default_value = DEFAULT_CAPTIONS_CSV)]
    csv_filename: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    let items = json_io::load_caption_items(&cli.json_filename)
        .with_context(|| format!("Failed to load {}", cli.json_filename.display()))?;
    let rows = CaptionFlattenUseCase::new().run(&items);
    csv_io::write_caption_rows(&cli.csv_filename, &rows)
        .with_context(|| format!("Failed to write {}", cli.csv_filename.display()))?;
    info!("CSV file created at: {}", cli.csv_filename.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("captions-to-csv");

    let result = run(&cli);
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
