//! Kind dispatch table

use std::collections::BTreeMap;

use kubechart_core::ManifestDocument;

use crate::error::Result;
use crate::kinds::{ConvertContext, Converted, autoscaler, config, service, storage, workload};

/// Pipeline entry point: document, allocated key, run context
pub type ConvertFn = fn(&ManifestDocument, &str, &ConvertContext<'_>) -> Result<Converted>;

/// Which key space a kind allocates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyNamespace {
    /// Top level of the values tree
    Object,
    /// Under the shared `persistence` namespace
    Persistence,
}

/// How one kind is converted and where its template goes
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    pub kind: &'static str,
    /// Middle part of `templates/<key>.<suffix>.yaml`
    pub file_suffix: &'static str,
    pub namespace: KeyNamespace,
    pub convert: ConvertFn,
}

impl Pipeline {
    pub const fn new(kind: &'static str, file_suffix: &'static str, convert: ConvertFn) -> Self {
        Self {
            kind,
            file_suffix,
            namespace: KeyNamespace::Object,
            convert,
        }
    }

    pub const fn in_persistence(mut self) -> Self {
        self.namespace = KeyNamespace::Persistence;
        self
    }
}

/// Supported kinds, keyed by `kind`
#[derive(Debug, Clone)]
pub struct KindRegistry {
    pipelines: BTreeMap<String, Pipeline>,
}

impl KindRegistry {
    /// Registry without any kind
    pub fn empty() -> Self {
        Self {
            pipelines: BTreeMap::new(),
        }
    }

    /// Registry with every built-in kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for pipeline in [
            Pipeline::new("Pod", "pod", workload::convert_pod),
            Pipeline::new("ReplicationController", "rc", workload::convert_replication_controller),
            Pipeline::new("Deployment", "deployment", workload::convert_deployment),
            Pipeline::new("ReplicaSet", "rs", workload::convert_replica_set),
            Pipeline::new("StatefulSet", "statefulset", workload::convert_stateful_set),
            Pipeline::new("Job", "job", workload::convert_job),
            Pipeline::new("DaemonSet", "daemonset", workload::convert_daemon_set),
            Pipeline::new("Service", "svc", service::convert_service),
            Pipeline::new("ConfigMap", "configmap", config::convert_config_map),
            Pipeline::new("Secret", "secret", config::convert_secret),
            Pipeline::new("PersistentVolumeClaim", "pvc", storage::convert_persistent_volume_claim)
                .in_persistence(),
            Pipeline::new("PersistentVolume", "pv", storage::convert_persistent_volume),
            Pipeline::new("StorageClass", "storage", storage::convert_storage_class),
            Pipeline::new(
                "HorizontalPodAutoscaler",
                "hpa",
                autoscaler::convert_horizontal_pod_autoscaler,
            ),
        ] {
            registry.register(pipeline);
        }
        registry
    }

    /// Add or replace the pipeline for a kind
    pub fn register(&mut self, pipeline: Pipeline) {
        if self.pipelines.insert(pipeline.kind.to_string(), pipeline).is_some() {
            tracing::debug!("pipeline for {} replaced", pipeline.kind);
        }
    }

    pub fn get(&self, kind: &str) -> Option<&Pipeline> {
        self.pipelines.get(kind)
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kinds() {
        let registry = KindRegistry::default();
        assert_eq!(registry.kinds().count(), 14);
        assert_eq!(registry.get("Service").unwrap().file_suffix, "svc");
        assert_eq!(
            registry.get("PersistentVolumeClaim").unwrap().namespace,
            KeyNamespace::Persistence
        );
        assert!(registry.get("Ingress").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = KindRegistry::empty();
        registry.register(Pipeline::new("Service", "svc", service::convert_service));
        registry.register(Pipeline::new("Service", "service", service::convert_service));
        assert_eq!(registry.kinds().count(), 1);
        assert_eq!(registry.get("Service").unwrap().file_suffix, "service");
    }
}
