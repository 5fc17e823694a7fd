use std::path::{Path, PathBuf};

use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use tracing::info;

use crate::app::ports::ImageSourcePort;
use crate::common::error::{PrepError, Result};
use crate::domain::ImageRecord;
use crate::infra::parquet_images::{read_image_rows, ImageColumns};

/// Branch the hub maintains with an automatic parquet export of every dataset.
pub const PARQUET_CONVERT_REVISION: &str = "refs/convert/parquet";

/// Parquet shards of `split` among the repository files, sorted.
///
/// Accepts the usual layouts: `data/train-00000-of-00002.parquet`,
/// `default/train/0000.parquet` and `train.parquet`.
pub fn select_split_shards(siblings: &[String], split: &str) -> Vec<String> {
    let split_dir = format!("{}/", split);
    let split_prefix = format!("{}-", split);
    let split_file = format!("{}.parquet", split);
    let mut shards: Vec<String> = siblings
        .iter()
        .filter(|remote_path| {
            let name = Path::new(remote_path.as_str())
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            let is_parquet = Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
            is_parquet
                && (remote_path.starts_with(&split_dir)
                    || remote_path.contains(&format!("/{}", split_dir))
                    || name.starts_with(&split_prefix)
                    || name == split_file)
        })
        .cloned()
        .collect();
    shards.sort();
    shards
}

/// Image source that downloads a dataset split from the Hugging Face hub.
#[derive(Debug, Clone)]
pub struct HuggingFaceImageSource {
    pub dataset: String,
    pub split: String,
    pub revision: Option<String>,
    pub token: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub columns: ImageColumns,
}

impl HuggingFaceImageSource {
    pub fn new(dataset: impl Into<String>, split: impl Into<String>, columns: ImageColumns) -> Self {
        Self {
            dataset: dataset.into(),
            split: split.into(),
            revision: None,
            token: None,
            cache_dir: None,
            columns,
        }
    }

    fn repo_api(&self, revision: Option<&str>) -> Result<ApiRepo> {
        let mut builder = ApiBuilder::new().with_progress(true);
        if let Some(token) = &self.token {
            builder = builder.with_token(Some(token.clone()));
        }
        if let Some(cache_dir) = &self.cache_dir {
            builder = builder.with_cache_dir(cache_dir.clone());
        }
        let api = builder.build()?;
        let repo = match revision {
            Some(revision) => Repo::with_revision(self.dataset.clone(), RepoType::Dataset, revision.to_string()),
            None => Repo::new(self.dataset.clone(), RepoType::Dataset),
        };
        Ok(api.repo(repo))
    }

    fn list_shards(&self, repo: &ApiRepo) -> Result<Vec<String>> {
        let siblings: Vec<String> = repo
            .info()?
            .siblings
            .into_iter()
            .map(|entry| entry.rfilename)
            .collect();
        Ok(select_split_shards(&siblings, &self.split))
    }
}

impl ImageSourcePort for HuggingFaceImageSource {
    fn load_images(&self) -> Result<Vec<ImageRecord>> {
        let mut repo = self.repo_api(self.revision.as_deref())?;
        info!("Reading remote file list for dataset {}", self.dataset);
        let mut shards = self.list_shards(&repo)?;

        // Datasets not stored as parquet still have the hub's parquet export
        if shards.is_empty() && self.revision.is_none() {
            info!("No '{}' parquet shards on the default branch, trying {}", self.split, PARQUET_CONVERT_REVISION);
            repo = self.repo_api(Some(PARQUET_CONVERT_REVISION))?;
            shards = self.list_shards(&repo)?;
        }
        if shards.is_empty() {
            return Err(PrepError::Config(format!(
                "dataset {} has no parquet shards for split '{}'",
                self.dataset, self.split
            )));
        }

        let mut records = Vec::new();
        for shard in &shards {
            let local = repo.get(shard)?;
            info!("Reading parquet shard {} ({})", shard, local.display());
            records.extend(read_image_rows(&local, &self.columns)?);
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("hub dataset {} (split {})", self.dataset, self.split)
    }
}
