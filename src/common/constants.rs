//! Defaults shared by the binaries and the configuration layer.

// MetadataMerger
pub const DEFAULT_DATASET_NAME: &str = "vector-institute/newsmediabias-plus-clean";
pub const DEFAULT_SPLIT: &str = "train";
pub const DEFAULT_ID_COLUMN: &str = "unique_id";
pub const DEFAULT_IMAGE_COLUMN: &str = "image";
pub const DEFAULT_HF_TOKEN_ENV: &str = "HF_TOKEN";
pub const IMAGE_EXTENSION: &str = "jpg";

// QAExtractor
pub const DEFAULT_MARKER_TOKEN: &str = "assistant";
pub const QUESTION_LABEL: &str = "Question:";
pub const ANSWER_LABEL: &str = "Answer:";
pub const MISSING_DESCRIPTION: &str = "No description provided";

// CaptionFlattener
pub const DEFAULT_CAPTIONS_JSON: &str = "data.json";
pub const DEFAULT_CAPTIONS_CSV: &str = "output.csv";

// Environment
pub const CONFIG_PATH_ENV: &str = "MMEVAL_CONFIG";
pub const LOG_DIR: &str = "logs";
