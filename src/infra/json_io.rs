use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::info;

use crate::common::error::{PrepError, Result};
use crate::domain::MetadataCollection;

pub fn load_json_value(path: &Path) -> Result<Value> {
    info!("Loading JSON file from {}...", path.display());
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_metadata(path: &Path) -> Result<MetadataCollection> {
    let metadata = MetadataCollection::from_json_value(load_json_value(path)?)?;
    info!("Loaded {} metadata entries", metadata.len());
    Ok(metadata)
}

/// Caption input must be a JSON array; its elements may have any shape.
pub fn load_caption_items(path: &Path) -> Result<Vec<Value>> {
    match load_json_value(path)? {
        Value::Array(items) => Ok(items),
        _ => Err(PrepError::DataIntegrity(format!(
            "{} must contain a JSON array",
            path.display()
        ))),
    }
}

/// Pretty JSON with four-space indentation, parent directories created.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}
