use serde_json::Value;
use tracing::info;

use crate::domain::FlatCaptionRow;
use crate::observability::metrics;
use crate::pipeline::caption_flatten::flatten_all;

/// Projects nested caption items into flat rows. Never fails per item.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptionFlattenUseCase;

impl CaptionFlattenUseCase {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, items: &[Value]) -> Vec<FlatCaptionRow> {
        let rows = flatten_all(items);
        metrics::captions::rows_written(rows.len());
        info!("Flattened {} caption items", rows.len());
        rows
    }
}
