use std::fmt;
use std::path::Path;

use crate::common::error::Result;
use crate::domain::{ImagePayload, ImageRecord};

/// Supplier of the image-bearing side of the merge.
pub trait ImageSourcePort {
    fn load_images(&self) -> Result<Vec<ImageRecord>>;

    /// Human-readable origin for log lines.
    fn describe(&self) -> String;
}

/// Storage-write capability for image payloads.
pub trait ImageStorePort {
    /// Create the destination directory. Must succeed if it already exists.
    fn ensure_dir(&self, dir: &Path) -> Result<()>;

    /// Check that a payload is a usable image without writing it.
    fn check(&self, id: &str, payload: &ImagePayload) -> Result<()>;

    fn write_image(&self, id: &str, payload: &ImagePayload, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    ImageCheck,
    ImageWrite,
    MetadataOutput,
    QaRow,
    QaDuplicate,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::ImageCheck => "image_check",
            FailureStage::ImageWrite => "image_write",
            FailureStage::MetadataOutput => "metadata_output",
            FailureStage::QaRow => "qa_row",
            FailureStage::QaDuplicate => "qa_duplicate",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that was skipped (fully or for one step) while its siblings went on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub id: String,
    pub stage: FailureStage,
    pub reason: String,
}

impl RecordFailure {
    pub fn new(id: impl Into<String>, stage: FailureStage, reason: impl fmt::Display) -> Self {
        Self {
            id: id.into(),
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Receiver of per-record diagnostics.
pub trait FailureSinkPort: Send + Sync {
    fn report(&self, failure: RecordFailure);
}
