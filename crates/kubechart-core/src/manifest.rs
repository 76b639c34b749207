//! Manifest documents read from disk
//!
//! Input files are plain Kubernetes YAML as exported from a cluster. A file
//! may hold several `---`-separated documents, and `kubectl get -o yaml`
//! wraps results in a `List` whose `items` are flattened here.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// One concrete resource document
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    /// Where the document came from (`file.yaml#2`)
    pub source: String,
    /// Kind discriminator
    pub kind: String,
    /// Declared `metadata.name`
    pub name: String,
    /// The full document as a JSON tree
    pub value: JsonValue,
}

impl ManifestDocument {
    /// Build a document from a parsed tree, reading just the kind and name
    pub fn from_value(source: impl Into<String>, value: JsonValue) -> Result<Self> {
        let source = source.into();
        let kind = value
            .get("kind")
            .and_then(JsonValue::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::MalformedDocument {
                source_name: source.clone(),
                message: "missing `kind`".to_string(),
            })?
            .to_string();
        let name = value
            .pointer("/metadata/name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| CoreError::MalformedDocument {
                source_name: source.clone(),
                message: format!("{kind} is missing `metadata.name`"),
            })?
            .to_string();

        Ok(Self {
            source,
            kind,
            name,
            value,
        })
    }

    /// Declared apiVersion, if any
    pub fn api_version(&self) -> Option<&str> {
        self.value.get("apiVersion").and_then(JsonValue::as_str)
    }
}

/// Split YAML text into resource documents
pub fn split_documents(source_name: &str, content: &str) -> Result<Vec<ManifestDocument>> {
    let mut documents = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let source = format!("{source_name}#{index}");
        let value = JsonValue::deserialize(document).map_err(|e| CoreError::MalformedDocument {
            source_name: source.clone(),
            message: e.to_string(),
        })?;

        match value {
            JsonValue::Null => continue,
            ref v if is_list(v) => {
                let items = v
                    .get("items")
                    .and_then(JsonValue::as_array)
                    .cloned()
                    .unwrap_or_default();
                for (item_index, item) in items.into_iter().enumerate() {
                    documents.push(ManifestDocument::from_value(
                        format!("{source}/items/{item_index}"),
                        item,
                    )?);
                }
            }
            value => documents.push(ManifestDocument::from_value(source, value)?),
        }
    }

    Ok(documents)
}

fn is_list(value: &JsonValue) -> bool {
    value
        .get("kind")
        .and_then(JsonValue::as_str)
        .is_some_and(|kind| kind == "List" || kind.ends_with("List"))
        && value.get("items").is_some()
}

fn is_manifest_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load documents from a file or from every YAML file directly inside a directory
///
/// Directory entries are visited in file-name order so repeated runs see the
/// same input order.
pub fn load_path(path: &Path) -> Result<Vec<ManifestDocument>> {
    if !path.exists() {
        return Err(CoreError::InputNotFound(path.to_path_buf()));
    }

    if path.is_file() {
        let content = std::fs::read_to_string(path)?;
        return split_documents(&path.display().to_string(), &content);
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let file = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if !is_manifest_file(file) {
            tracing::info!("skipping {} (not a YAML file)", file.display());
            continue;
        }
        let content = std::fs::read_to_string(file)?;
        documents.extend(split_documents(&file.display().to_string(), &content)?);
    }

    Ok(documents)
}

/// Load documents from several inputs, preserving argument order
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<ManifestDocument>> {
    let mut documents = Vec::new();
    for path in paths {
        documents.extend(load_path(path)?);
    }
    Ok(documents)
}
