//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Malformed document in {source_name}: {message}")]
    MalformedDocument { source_name: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
