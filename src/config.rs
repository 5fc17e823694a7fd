use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::qa_extract_use_case::DuplicatePolicy;
use crate::common::constants::{
    CONFIG_PATH_ENV, DEFAULT_DATASET_NAME, DEFAULT_HF_TOKEN_ENV, DEFAULT_ID_COLUMN, DEFAULT_IMAGE_COLUMN,
    DEFAULT_MARKER_TOKEN, DEFAULT_SPLIT, MISSING_DESCRIPTION,
};
use crate::common::error::{PrepError, Result};
use crate::infra::parquet_images::ImageColumns;

/// Optional TOML settings shared by the binaries. Every key has a default and
/// command line flags take precedence over file values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepConfig {
    pub merge: MergeConfig,
    pub qa: QaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub dataset_name: String,
    pub split: String,
    pub revision: Option<String>,
    pub id_column: String,
    pub image_column: String,
    /// Name of the environment variable holding the hub token.
    pub hf_token_env: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            split: DEFAULT_SPLIT.to_string(),
            revision: None,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            image_column: DEFAULT_IMAGE_COLUMN.to_string(),
            hf_token_env: DEFAULT_HF_TOKEN_ENV.to_string(),
            cache_dir: None,
        }
    }
}

impl MergeConfig {
    pub fn hf_token(&self) -> Option<String> {
        std::env::var(&self.hf_token_env).ok().filter(|t| !t.is_empty())
    }

    pub fn columns(&self) -> ImageColumns {
        ImageColumns {
            id_column: self.id_column.clone(),
            image_column: self.image_column.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QaConfig {
    pub marker_token: String,
    pub missing_description: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            marker_token: DEFAULT_MARKER_TOKEN.to_string(),
            missing_description: MISSING_DESCRIPTION.to_string(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl PrepConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PrepError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Explicit path first, then `MMEVAL_CONFIG`, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
                _ => Ok(Self::default()),
            },
        }
    }
}

/// Resolve `target` the way the merge script always has: relative paths are
/// taken from the directory holding the metadata file.
pub fn resolve_against_metadata_dir(metadata_path: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match metadata_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(target),
        _ => target.to_path_buf(),
    }
}
