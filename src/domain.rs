//! Data shapes shared by the three pipelines.
//!
//! Identifiers are kept as strings everywhere. Sources disagree on whether an
//! id is `1` or `"1"`, so numeric JSON ids are rendered to their decimal text
//! before any join or lookup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::error::{PrepError, Result};

/// Render a JSON scalar usable as an identifier.
pub fn identifier_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text form of a JSON value as it would be written into a flat file.
/// `null` becomes the empty string, strings are copied verbatim.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One annotated item from the metadata file.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub id: String,
    pub image_description: Option<String>,
    /// Opaque structured value, passed through untouched.
    pub attributes: Option<Value>,
    pub attribute: Option<String>,
}

impl MetadataRecord {
    fn from_object(id: String, object: &Map<String, Value>) -> Self {
        let non_null = |key: &str| object.get(key).filter(|v| !v.is_null());
        Self {
            id,
            image_description: non_null("image_description").map(value_to_text),
            attributes: non_null("attributes").cloned(),
            attribute: non_null("attribute").map(value_to_text),
        }
    }
}

/// Metadata keyed by id, iterated in file order.
///
/// A repeated id replaces the earlier record but keeps its first position.
#[derive(Debug, Clone, Default)]
pub struct MetadataCollection {
    records: IndexMap<String, MetadataRecord>,
}

impl MetadataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: MetadataRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Build from either accepted file shape: an array of objects carrying
    /// `id`, or an object whose keys are the ids.
    pub fn from_json_value(value: Value) -> Result<Self> {
        let mut collection = Self::new();
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let object = item.as_object().ok_or_else(|| {
                        PrepError::DataIntegrity(format!(
                            "metadata entry {} is not an object",
                            index
                        ))
                    })?;
                    let id = object
                        .get("id")
                        .and_then(identifier_from_value)
                        .ok_or_else(|| PrepError::missing_field(format!("<entry {}>", index), "id"))?;
                    collection.insert(MetadataRecord::from_object(id, object));
                }
            }
            Value::Object(entries) => {
                for (id, item) in &entries {
                    let object = item.as_object().ok_or_else(|| {
                        PrepError::DataIntegrity(format!("metadata entry {} is not an object", id))
                    })?;
                    collection.insert(MetadataRecord::from_object(id.clone(), object));
                }
            }
            other => {
                return Err(PrepError::DataIntegrity(format!(
                    "metadata must be a JSON array or object, found {}",
                    json_kind(&other)
                )))
            }
        }
        Ok(collection)
    }

    pub fn get(&self, id: &str) -> Option<&MetadataRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<MetadataRecord> for MetadataCollection {
    fn from_iter<I: IntoIterator<Item = MetadataRecord>>(iter: I) -> Self {
        let mut collection = Self::new();
        for record in iter {
            collection.insert(record);
        }
        collection
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Raw image as delivered by the dataset; decoding happens only when needed.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    Encoded(Vec<u8>),
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: String,
    pub payload: ImagePayload,
}

/// A metadata entry paired with its image after the inner join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub metadata: MetadataRecord,
    pub image: ImagePayload,
}

impl JoinedRecord {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

/// Output element of the merge pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub id: String,
    pub image_path: String,
    pub image_description: String,
    pub attributes: Value,
}

/// One row of the generated-responses CSV. Every column is optional at this
/// level so that a missing cell is reported per row instead of failing the read.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneratedResponseRow {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub generated_question: Option<String>,
}

/// Question/answer pair pulled out of generated text. Either side is `None`
/// when its label was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QaPair {
    pub question: Option<String>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub attribute: Option<String>,
    pub image_description: String,
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// Output of the QA pipeline, keyed by id in first-seen order.
pub type QaOutput = IndexMap<String, QaRecord>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatCaptionRow {
    pub id: String,
    pub image_path: String,
    pub csv_simple: String,
    pub csv_emphatic: String,
    pub model_simple: String,
    pub model_empathetic: String,
}
