// Pure transformation steps: join, extraction and flattening

pub mod caption_flatten;
pub mod merge;
pub mod qa_extract;

// Re-export the entry points used by the use cases
pub use caption_flatten::{flatten_all, flatten_one};
pub use merge::{image_path_for, merge, to_merged_record, OutputCoverage};
pub use qa_extract::{extract_one, process_row, QaScanner};
