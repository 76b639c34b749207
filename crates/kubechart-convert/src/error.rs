//! Error types for the templatization engine

use std::path::PathBuf;
use thiserror::Error;

/// Converter error
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] kubechart_core::CoreError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read {kind} '{name}': {source}")]
    Unmarshal {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {kind} '{name}': {source}")]
    Serialize {
        kind: String,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0} already exists and is not a directory")]
    OutputNotDirectory(PathBuf),

    #[error("Splice anchor '{anchor}' not found in serialized template")]
    MissingAnchor { anchor: String },
}

impl ConvertError {
    /// Whether this error concerns a single object rather than the whole run
    pub fn is_per_object(&self) -> bool {
        matches!(
            self,
            Self::Unmarshal { .. } | Self::Serialize { .. } | Self::MissingAnchor { .. }
        )
    }
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
