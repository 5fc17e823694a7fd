pub mod ports;
pub mod merge_use_case;
pub mod qa_extract_use_case;
pub mod caption_flatten_use_case;
