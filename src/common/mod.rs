// Common utilities and shared types used across the pipelines

pub mod constants;
pub mod error;

// Re-export commonly used items at module root for convenience
pub use error::{PrepError, Result};
