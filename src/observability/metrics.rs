//! Run metrics for the prep pipelines.
//!
//! Counters go through the `metrics` facade. When a binary is asked for a
//! metrics snapshot it installs a Prometheus recorder up front and renders the
//! text exposition once the run is over. Without a recorder every call below
//! is a no-op.

use std::fmt;
use std::fs;
use std::path::Path;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Metric names used by the pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    MergeImagesLoaded,
    MergeRecordsJoined,
    MergeImagesWritten,
    MergeRecordsEmitted,
    RecordFailures,
    QaRowsProcessed,
    QaExtractionMisses,
    CaptionRowsWritten,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::MergeImagesLoaded => "mmeval_merge_images_loaded_total",
            MetricName::MergeRecordsJoined => "mmeval_records_merged_total",
            MetricName::MergeImagesWritten => "mmeval_images_written_total",
            MetricName::MergeRecordsEmitted => "mmeval_merge_records_emitted_total",
            MetricName::RecordFailures => "mmeval_record_failures_total",
            MetricName::QaRowsProcessed => "mmeval_qa_rows_processed_total",
            MetricName::QaExtractionMisses => "mmeval_qa_extraction_misses_total",
            MetricName::CaptionRowsWritten => "mmeval_caption_rows_written_total",
        }
    }
}

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Prometheus text exposition of everything recorded so far.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Write the current snapshot to `path`. Does nothing if `init` was never called.
pub fn write_snapshot(path: &Path) -> std::io::Result<()> {
    if let Some(text) = render() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
    }
    Ok(())
}

pub fn record_failure(stage: &str) {
    ::metrics::counter!(MetricName::RecordFailures.as_str(), "stage" => stage.to_string()).increment(1);
}

pub mod merge {
    use super::MetricName;

    pub fn images_loaded(count: usize) {
        ::metrics::counter!(MetricName::MergeImagesLoaded.as_str()).increment(count as u64);
    }

    pub fn records_joined(count: usize) {
        ::metrics::counter!(MetricName::MergeRecordsJoined.as_str()).increment(count as u64);
    }

    pub fn image_written() {
        ::metrics::counter!(MetricName::MergeImagesWritten.as_str()).increment(1);
    }

    pub fn records_emitted(count: usize) {
        ::metrics::counter!(MetricName::MergeRecordsEmitted.as_str()).increment(count as u64);
    }
}

pub mod qa {
    use super::MetricName;

    pub fn row_processed() {
        ::metrics::counter!(MetricName::QaRowsProcessed.as_str()).increment(1);
    }

    /// `field` is either "question" or "answer".
    pub fn extraction_miss(field: &'static str) {
        ::metrics::counter!(MetricName::QaExtractionMisses.as_str(), "field" => field).increment(1);
    }
}

pub mod captions {
    use super::MetricName;

    pub fn rows_written(count: usize) {
        ::metrics::counter!(MetricName::CaptionRowsWritten.as_str()).increment(count as u64);
    }
}
