// Adapters behind the application ports, plus file codecs

pub mod csv_io;
pub mod failure_sink;
pub mod hf_dataset;
pub mod image_store;
pub mod json_io;
pub mod parquet_images;
