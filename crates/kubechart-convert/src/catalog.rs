//! Pre-pass over the input: which objects are in the chart, and their keys

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use kubechart_core::ManifestDocument;

use crate::key::KeyAllocator;
use crate::registry::{KeyNamespace, KindRegistry};

/// Kind of the objects keyed in the persistence namespace
pub const CLAIM_KIND: &str = "PersistentVolumeClaim";

/// Volume lists of a bare pod and of a pod template
const POD_VOLUMES: &[&str] = &["/spec/volumes", "/spec/template/spec/volumes"];

/// A chart object and the values key allocated to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: String,
    pub name: String,
    pub key: String,
}

/// Keys for every supported object, allocated in input order
///
/// Objects with unsupported kinds get no entry. Storage claims draw their keys
/// from the persistence namespace, everything else from the top level, so a
/// claim and a workload may share a key without clashing. Claims that pods
/// mount but the chart does not create are keyed by claim name in the same
/// persistence namespace, after every chart claim.
#[derive(Debug, Clone, Default)]
pub struct ObjectCatalog {
    entries: Vec<Option<CatalogEntry>>,
    by_name: BTreeMap<(String, String), usize>,
    external_claims: BTreeMap<String, String>,
}

impl ObjectCatalog {
    pub fn build(documents: &[ManifestDocument], registry: &KindRegistry) -> Self {
        let mut objects = KeyAllocator::new();
        let mut claims = KeyAllocator::new();
        let mut catalog = Self::default();

        for (index, document) in documents.iter().enumerate() {
            let Some(pipeline) = registry.get(&document.kind) else {
                catalog.entries.push(None);
                continue;
            };

            let allocator = match pipeline.namespace {
                KeyNamespace::Object => &mut objects,
                KeyNamespace::Persistence => &mut claims,
            };
            let key = allocator.allocate(&document.name, &document.kind);

            catalog
                .by_name
                .entry((document.kind.clone(), document.name.clone()))
                .or_insert(index);
            catalog.entries.push(Some(CatalogEntry {
                kind: document.kind.clone(),
                name: document.name.clone(),
                key,
            }));
        }

        for document in documents {
            let supported = registry
                .get(&document.kind)
                .is_some_and(|pipeline| pipeline.namespace == KeyNamespace::Object);
            if !supported {
                continue;
            }
            for claim_name in mounted_claims(&document.value) {
                if catalog.key_of(CLAIM_KIND, claim_name).is_some()
                    || catalog.external_claims.contains_key(claim_name)
                {
                    continue;
                }
                let key = claims.allocate(claim_name, CLAIM_KIND);
                catalog.external_claims.insert(claim_name.to_string(), key);
            }
        }

        catalog
    }

    /// Entry for the document at `index` in the input order
    pub fn entry(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Key of the chart object `kind`/`name`, if it is part of the chart
    pub fn key_of(&self, kind: &str, name: &str) -> Option<&str> {
        let index = self.by_name.get(&(kind.to_string(), name.to_string()))?;
        self.entry(*index).map(|entry| entry.key.as_str())
    }

    /// Persistence key of a mounted claim the chart does not create
    pub fn external_claim_key(&self, claim_name: &str) -> Option<&str> {
        self.external_claims.get(claim_name).map(String::as_str)
    }
}

/// Claim names mounted by the pod spec of a raw document
fn mounted_claims(value: &JsonValue) -> Vec<&str> {
    POD_VOLUMES
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .filter_map(JsonValue::as_array)
        .flatten()
        .filter_map(|volume| volume.pointer("/persistentVolumeClaim/claimName"))
        .filter_map(JsonValue::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(kind: &str, name: &str) -> ManifestDocument {
        ManifestDocument::from_value(
            "test.yaml",
            json!({"apiVersion": "v1", "kind": kind, "metadata": {"name": name}}),
        )
        .unwrap()
    }

    fn deployment(name: &str, volume: &str, claim: &str) -> ManifestDocument {
        ManifestDocument::from_value(
            "test.yaml",
            json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": name},
                "spec": {"template": {"spec": {"volumes": [
                    {"name": volume, "persistentVolumeClaim": {"claimName": claim}}
                ]}}}
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_keys_follow_input_order() {
        let documents = vec![
            doc("Deployment", "web"),
            doc("Service", "web"),
            doc("ConfigMap", "web-config"),
        ];
        let catalog = ObjectCatalog::build(&documents, &KindRegistry::default());

        assert_eq!(catalog.entry(0).unwrap().key, "web");
        assert_eq!(catalog.entry(1).unwrap().key, "webService");
        assert_eq!(catalog.key_of("ConfigMap", "web-config"), Some("webConfig"));
        assert!(catalog.entry(3).is_none());
    }

    #[test]
    fn test_claims_use_their_own_namespace() {
        let documents = vec![
            doc("StatefulSet", "data"),
            doc("PersistentVolumeClaim", "data"),
        ];
        let catalog = ObjectCatalog::build(&documents, &KindRegistry::default());

        assert_eq!(catalog.key_of("StatefulSet", "data"), Some("data"));
        assert_eq!(catalog.key_of("PersistentVolumeClaim", "data"), Some("data"));
    }

    #[test]
    fn test_unsupported_kinds_have_no_entry() {
        let documents = vec![doc("Ingress", "web"), doc("Service", "web")];
        let catalog = ObjectCatalog::build(&documents, &KindRegistry::default());

        assert!(catalog.entry(0).is_none());
        assert_eq!(catalog.entry(1).unwrap().key, "web");
        assert_eq!(catalog.key_of("Ingress", "web"), None);
    }

    #[test]
    fn test_external_claims_are_keyed_by_claim_name() {
        let documents = vec![
            deployment("a", "data", "a-data"),
            deployment("b", "data", "b-data"),
            deployment("c", "shared", "a-data"),
        ];
        let catalog = ObjectCatalog::build(&documents, &KindRegistry::default());

        assert_eq!(catalog.external_claim_key("a-data"), Some("aData"));
        assert_eq!(catalog.external_claim_key("b-data"), Some("bData"));
        assert_eq!(catalog.external_claim_key("data"), None);
    }

    #[test]
    fn test_external_claims_never_take_a_chart_claim_key() {
        let documents = vec![
            deployment("web", "cache", "web.data"),
            deployment("api", "data", "web-data"),
            doc("PersistentVolumeClaim", "web-data"),
        ];
        let catalog = ObjectCatalog::build(&documents, &KindRegistry::default());

        assert_eq!(catalog.key_of(CLAIM_KIND, "web-data"), Some("webData"));
        assert_eq!(catalog.external_claim_key("web-data"), None);
        assert_eq!(
            catalog.external_claim_key("web.data"),
            Some("webDataPersistentVolumeClaim")
        );
    }
}
