use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::constants::IMAGE_EXTENSION;
use crate::common::error::{PrepError, Result};
use crate::domain::{ImagePayload, ImageRecord, JoinedRecord, MergedRecord, MetadataCollection, MetadataRecord};

/// Which metadata entries the output pass emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputCoverage {
    /// Every metadata entry, matched or not.
    #[default]
    AllMetadata,
    /// Only ids that survived the inner join.
    MatchedOnly,
}

/// Inner join of metadata and dataset images on id, in metadata order.
///
/// The first image wins when the dataset repeats an id. An empty result means
/// the two sources do not share keys at all, which is treated as fatal.
pub fn merge(metadata: &MetadataCollection, images: Vec<ImageRecord>) -> Result<Vec<JoinedRecord>> {
    let mut by_id: HashMap<String, ImagePayload> = HashMap::with_capacity(images.len());
    for image in images {
        if by_id.contains_key(&image.id) {
            debug!(id = %image.id, "duplicate image id in dataset, keeping first");
            continue;
        }
        by_id.insert(image.id, image.payload);
    }

    let joined: Vec<JoinedRecord> = metadata
        .iter()
        .filter_map(|record| {
            by_id.remove(&record.id).map(|image| JoinedRecord {
                metadata: record.clone(),
                image,
            })
        })
        .collect();

    if joined.is_empty() {
        return Err(PrepError::DataIntegrity(
            "No matching data found between metadata and the image dataset".to_string(),
        ));
    }
    Ok(joined)
}

/// Destination of an item's image: `{output_dir}/{id}.jpg`.
pub fn image_path_for(output_dir: &Path, id: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", id, IMAGE_EXTENSION))
}

/// Output entry for one metadata record. The path is computed whether or not
/// the image was ever written.
pub fn to_merged_record(record: &MetadataRecord, output_dir: &Path) -> Result<MergedRecord> {
    let image_description = record
        .image_description
        .clone()
        .ok_or_else(|| PrepError::missing_field(record.id.clone(), "image_description"))?;
    let attributes = record
        .attributes
        .clone()
        .ok_or_else(|| PrepError::missing_field(record.id.clone(), "attributes"))?;

    Ok(MergedRecord {
        id: record.id.clone(),
        image_path: image_path_for(output_dir, &record.id).to_string_lossy().into_owned(),
        image_description,
        attributes,
    })
}
