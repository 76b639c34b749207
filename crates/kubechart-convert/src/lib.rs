//! Kubechart Convert - turn deployed Kubernetes manifests into a Helm chart
//!
//! Each resource is parsed into its typed `k8s-openapi` shape, stripped of
//! cluster-assigned fields, and has selected fields replaced with
//! `{{ .Values.<key>.<field> }}` references whose defaults are collected into
//! one values tree.
//!
//! Some output cannot be expressed through the typed model (conditional
//! volume blocks, random fallbacks for secrets, integer fields holding a
//! template expression), so rendering is two-phase:
//!
//! 1. mutate the typed object and serialize it to YAML
//! 2. splice raw template text in at named anchors
//!
//! # Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use kubechart_convert::{GenerateOptions, Generator};
//!
//! let documents = kubechart_core::load_path(Path::new("./exported")).unwrap();
//! let generator = Generator::new(GenerateOptions::new("shop", PathBuf::from("./charts")));
//! let report = generator.generate(&documents).unwrap();
//!
//! println!("{}", report.summary());
//! ```
//!
//! # Supported kinds
//!
//! Pod, ReplicationController, Deployment, ReplicaSet, StatefulSet, Job,
//! DaemonSet, Service, ConfigMap, Secret, PersistentVolumeClaim,
//! PersistentVolume, StorageClass and HorizontalPodAutoscaler. Anything else
//! is reported and skipped.

pub mod catalog;
pub mod error;
pub mod generator;
pub mod key;
pub mod kinds;
pub mod metadata;
pub mod pod;
pub mod registry;
pub mod render;
pub mod report;
pub mod scope;
pub mod secret;
pub mod selector;
pub mod volume;

// Re-exports
pub use catalog::{CatalogEntry, ObjectCatalog};
pub use error::{ConvertError, Result};
pub use generator::{GenerateOptions, Generator};
pub use key::{KeyAllocator, safe_key};
pub use kinds::{ConvertContext, Converted};
pub use registry::{ConvertFn, KeyNamespace, KindRegistry, Pipeline};
pub use report::{GenerationReport, ObjectOutcome};
pub use scope::ValueScope;
