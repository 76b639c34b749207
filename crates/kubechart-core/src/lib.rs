//! Kubechart Core - Core types for turning cluster manifests into Helm charts
//!
//! This crate provides the foundational types used throughout kubechart:
//! - `Values`: the aggregated default-values tree with deep merge support
//! - `ChartMetadata`: the `Chart.yaml` written next to the templates
//! - `ManifestDocument`: a single resource document read from disk

pub mod chart;
pub mod error;
pub mod manifest;
pub mod values;

pub use chart::{ChartLayout, ChartMetadata};
pub use error::{CoreError, Result};
pub use manifest::{ManifestDocument, load_documents, load_path, split_documents};
pub use values::Values;
