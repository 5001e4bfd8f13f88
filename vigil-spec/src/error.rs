//! Errors raised while reading specification documents.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Failed to read specification file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
