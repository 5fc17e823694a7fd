//! Reads `(id, image)` rows out of parquet shards.
//!
//! Image columns written by the `datasets` library are structs of
//! `{bytes, path}`; plain binary columns are accepted as well.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use tracing::{info, warn};

use crate::app::ports::ImageSourcePort;
use crate::common::constants::{DEFAULT_ID_COLUMN, DEFAULT_IMAGE_COLUMN};
use crate::common::error::{PrepError, Result};
use crate::domain::{ImagePayload, ImageRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageColumns {
    pub id_column: String,
    pub image_column: String,
}

impl Default for ImageColumns {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            image_column: DEFAULT_IMAGE_COLUMN.to_string(),
        }
    }
}

fn field_to_id(field: &Field) -> Option<String> {
    match field {
        Field::Str(s) => Some(s.clone()),
        Field::Bytes(b) => Some(String::from_utf8_lossy(b.data()).into_owned()),
        Field::Byte(v) => Some(v.to_string()),
        Field::Short(v) => Some(v.to_string()),
        Field::Int(v) => Some(v.to_string()),
        Field::Long(v) => Some(v.to_string()),
        Field::UByte(v) => Some(v.to_string()),
        Field::UShort(v) => Some(v.to_string()),
        Field::UInt(v) => Some(v.to_string()),
        Field::ULong(v) => Some(v.to_string()),
        _ => None,
    }
}

fn field_to_payload(field: &Field) -> ImagePayload {
    match field {
        Field::Bytes(b) => ImagePayload::Encoded(b.data().to_vec()),
        Field::Group(inner) => inner
            .get_column_iter()
            .find(|(name, _)| name.as_str() == "bytes")
            .map(|(_, bytes)| field_to_payload(bytes))
            .unwrap_or(ImagePayload::Missing),
        _ => ImagePayload::Missing,
    }
}

/// `None` when the row has no usable id.
pub fn image_record_from_row(row: &Row, columns: &ImageColumns) -> Option<ImageRecord> {
    let mut id = None;
    let mut payload = ImagePayload::Missing;
    for (name, field) in row.get_column_iter() {
        if *name == columns.id_column {
            id = field_to_id(field);
        } else if *name == columns.image_column {
            payload = field_to_payload(field);
        }
    }
    id.map(|id| ImageRecord { id, payload })
}

pub fn read_image_rows(path: &Path, columns: &ImageColumns) -> Result<Vec<ImageRecord>> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let mut records = Vec::new();
    for (index, row) in reader.get_row_iter(None)?.enumerate() {
        let row = row?;
        match image_record_from_row(&row, columns) {
            Some(record) => records.push(record),
            None => warn!(
                path = %path.display(),
                row = index,
                "row has no '{}' value, skipped",
                columns.id_column
            ),
        }
    }
    Ok(records)
}

/// Parquet files under `root` (or `root` itself), sorted by path.
pub fn collect_parquet_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"))
            {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Image source backed by parquet files already on disk.
#[derive(Debug, Clone)]
pub struct LocalParquetImageSource {
    root: PathBuf,
    columns: ImageColumns,
}

impl LocalParquetImageSource {
    pub fn new(root: impl Into<PathBuf>, columns: ImageColumns) -> Self {
        Self {
            root: root.into(),
            columns,
        }
    }
}

impl ImageSourcePort for LocalParquetImageSource {
    fn load_images(&self) -> Result<Vec<ImageRecord>> {
        let files = collect_parquet_files(&self.root)?;
        if files.is_empty() {
            return Err(PrepError::Config(format!(
                "no parquet files found under {}",
                self.root.display()
            )));
        }
        let mut records = Vec::new();
        for file in &files {
            info!("Reading parquet shard {}", file.display());
            records.extend(read_image_rows(file, &self.columns)?);
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("local parquet at {}", self.root.display())
    }
}
