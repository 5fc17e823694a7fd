use serde_json::Value;

use crate::domain::{value_to_text, FlatCaptionRow};

pub const CSV_CAPTIONS: &str = "csv_captions";
pub const MODEL_CAPTIONS: &str = "model_captions";

/// Field at `path`, or `""` as soon as any level is missing, null or not an
/// object.
fn text_at(item: &Value, path: &[&str]) -> String {
    path.iter()
        .try_fold(item, |current, key| current.as_object()?.get(*key))
        .map(value_to_text)
        .unwrap_or_default()
}

pub fn flatten_one(item: &Value) -> FlatCaptionRow {
    FlatCaptionRow {
        id: text_at(item, &["id"]),
        image_path: text_at(item, &["image_path"]),
        csv_simple: text_at(item, &[CSV_CAPTIONS, "csv_simple"]),
        csv_emphatic: text_at(item, &[CSV_CAPTIONS, "csv_emphatic"]),
        model_simple: text_at(item, &[MODEL_CAPTIONS, "model_simple"]),
        model_empathetic: text_at(item, &[MODEL_CAPTIONS, "model_empathetic"]),
    }
}

pub fn flatten_all(items: &[Value]) -> Vec<FlatCaptionRow> {
    items.iter().map(flatten_one).collect()
}
