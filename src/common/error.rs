use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Hugging Face hub error: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field '{field}' for ID {id}")]
    MissingField { id: String, field: String },

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),
}

impl PrepError {
    pub fn missing_field(id: impl Into<String>, field: impl Into<String>) -> Self {
        PrepError::MissingField {
            id: id.into(),
            field: field.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
