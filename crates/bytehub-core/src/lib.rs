//! Core utilities and types shared across all Bytehub crates

pub mod config;
pub mod error;
pub mod identifiers;
pub mod table;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use identifiers::{resolve, split_name, FeatureSelector, SelectorItem};
pub use table::Table;
pub use types::*;
pub use validation::validate_kwargs;

// Re-export external dependencies
pub use chrono;
pub use serde_json;
