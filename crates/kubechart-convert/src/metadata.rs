//! Object metadata normalization
//!
//! Strips what the cluster assigned to a deployed object and externalizes
//! its name.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::scope::ValueScope;

/// Labels and annotations injected by controllers and tooling
pub const DECORATORS: &[&str] = &[
    "controller-uid",
    "batch.kubernetes.io/controller-uid",
    "job-name",
    "batch.kubernetes.io/job-name",
    "deployment.kubernetes.io/desired-replicas",
    "deployment.kubernetes.io/max-replicas",
    "deployment.kubernetes.io/revision",
    "pod-template-hash",
    "pv.kubernetes.io/bind-completed",
    "pv.kubernetes.io/bound-by-controller",
    "pv.kubernetes.io/provisioned-by",
    "volume.beta.kubernetes.io/storage-provisioner",
    "volume.kubernetes.io/storage-provisioner",
    "kubectl.kubernetes.io/last-applied-configuration",
];

/// Finalizers added by the storage protection controllers
const PROTECTION_FINALIZERS: &[&str] = &["kubernetes.io/pvc-protection", "kubernetes.io/pv-protection"];

/// Remove controller decorators, dropping the map when nothing is left
pub fn strip_decorators(map: &mut Option<BTreeMap<String, String>>) {
    if let Some(entries) = map {
        for decorator in DECORATORS {
            entries.remove(*decorator);
        }
        if entries.is_empty() {
            *map = None;
        }
    }
}

/// Clear every runtime-assigned field of a metadata block
pub fn clean_object_meta(meta: &mut ObjectMeta) {
    meta.generate_name = None;
    meta.resource_version = None;
    meta.generation = None;
    meta.creation_timestamp = None;
    meta.deletion_timestamp = None;
    meta.deletion_grace_period_seconds = None;
    meta.uid = None;
    meta.self_link = None;
    meta.managed_fields = None;
    meta.owner_references = None;
    meta.namespace = None;

    if let Some(finalizers) = meta.finalizers.as_mut() {
        finalizers.retain(|f| !PROTECTION_FINALIZERS.contains(&f.as_str()));
        if finalizers.is_empty() {
            meta.finalizers = None;
        }
    }

    strip_decorators(&mut meta.labels);
    strip_decorators(&mut meta.annotations);
}

/// Normalize an object's metadata and externalize its name
pub fn templatize_object_meta(meta: &mut ObjectMeta, scope: &mut ValueScope) {
    clean_object_meta(meta);
    if let Some(name) = meta.name.take() {
        meta.name = Some(scope.externalize("name", name));
    }
}

/// Normalize the metadata of an embedded pod template or claim template
pub fn clean_template_meta(meta: &mut Option<ObjectMeta>) {
    if let Some(inner) = meta {
        clean_object_meta(inner);
        if *inner == ObjectMeta::default() {
            *meta = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn labels(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn deployed_meta() -> ObjectMeta {
        ObjectMeta {
            name: Some("web".into()),
            namespace: Some("prod".into()),
            generate_name: Some("web-".into()),
            resource_version: Some("12345".into()),
            generation: Some(4),
            uid: Some("7f8e".into()),
            creation_timestamp: serde_json::from_str::<Time>("\"2024-01-01T00:00:00Z\"").ok(),
            labels: labels(&[("app", "web"), ("pod-template-hash", "abc123")]),
            annotations: labels(&[("deployment.kubernetes.io/revision", "3")]),
            finalizers: Some(vec!["kubernetes.io/pvc-protection".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_runtime_fields_are_cleared() {
        let mut meta = deployed_meta();
        clean_object_meta(&mut meta);

        assert_eq!(meta.name.as_deref(), Some("web"));
        assert!(meta.namespace.is_none());
        assert!(meta.generate_name.is_none());
        assert!(meta.resource_version.is_none());
        assert!(meta.generation.is_none());
        assert!(meta.uid.is_none());
        assert!(meta.creation_timestamp.is_none());
        assert!(meta.finalizers.is_none());
    }

    #[test]
    fn test_decorators_are_removed() {
        let mut meta = deployed_meta();
        clean_object_meta(&mut meta);

        assert_eq!(meta.labels, labels(&[("app", "web")]));
        assert!(meta.annotations.is_none(), "emptied annotations are dropped");
    }

    #[test]
    fn test_name_is_externalized() {
        let mut meta = deployed_meta();
        let mut scope = ValueScope::new("web");
        templatize_object_meta(&mut meta, &mut scope);

        assert_eq!(meta.name.as_deref(), Some("{{ .Values.web.name }}"));
        assert_eq!(scope.get("name").unwrap(), "web");
    }

    #[test]
    fn test_empty_template_meta_is_dropped() {
        let mut meta = Some(ObjectMeta {
            creation_timestamp: serde_json::from_str::<Time>("\"2024-01-01T00:00:00Z\"").ok(),
            labels: labels(&[("pod-template-hash", "abc")]),
            ..Default::default()
        });
        clean_template_meta(&mut meta);
        assert!(meta.is_none());
    }
}
