//! Per-kind pipelines
//!
//! Every pipeline has the same shape: read the document into its typed
//! form, normalize and templatize it, serialize and prune, then splice the
//! raw blocks. Each returns the template text together with the defaults it
//! referenced.

pub mod autoscaler;
pub mod config;
pub mod service;
pub mod storage;
pub mod workload;

use k8s_openapi::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use kubechart_core::ManifestDocument;

use crate::catalog::ObjectCatalog;
use crate::error::{ConvertError, Result};
use crate::pod::rewrite_references;
use crate::render;
use crate::volume::ExtractedVolumes;

/// Run-wide information available to every pipeline
#[derive(Debug, Clone, Copy)]
pub struct ConvertContext<'a> {
    pub catalog: &'a ObjectCatalog,
}

impl<'a> ConvertContext<'a> {
    pub fn new(catalog: &'a ObjectCatalog) -> Self {
        Self { catalog }
    }
}

/// Output of one pipeline
#[derive(Debug, Clone, Default)]
pub struct Converted {
    /// Template text for `templates/<key>.<suffix>.yaml`
    pub template: String,
    /// Defaults merged under the object's key
    pub values: Map<String, JsonValue>,
    /// Defaults merged under the shared persistence namespace, by claim key
    pub persistence: Map<String, JsonValue>,
}

/// Read a document into its typed form
///
/// Older group versions (`extensions/v1beta1`, `apps/v1beta2`, ...) are read
/// as the current one and emitted with the current `apiVersion`.
pub(crate) fn parse_typed<K>(document: &ManifestDocument, mut value: JsonValue) -> Result<K>
where
    K: Resource + DeserializeOwned,
{
    if let Some(object) = value.as_object_mut() {
        let declared = object.get("apiVersion").and_then(JsonValue::as_str);
        if declared != Some(K::API_VERSION) {
            tracing::debug!(
                "reading {} '{}' ({}) as {}",
                document.kind,
                document.name,
                declared.unwrap_or("no apiVersion"),
                K::API_VERSION
            );
        }
        object.insert(
            "apiVersion".to_string(),
            JsonValue::String(K::API_VERSION.to_string()),
        );
    }

    serde_json::from_value(value).map_err(|source| ConvertError::Unmarshal {
        kind: document.kind.clone(),
        name: document.name.clone(),
        source,
    })
}

/// Copy of the document with references to chart objects rewritten in the
/// pod spec found at `pod_spec`
pub(crate) fn with_references(
    document: &ManifestDocument,
    pod_spec: &str,
    ctx: &ConvertContext<'_>,
) -> JsonValue {
    let mut value = document.value.clone();
    if let Some(spec) = value.pointer_mut(pod_spec) {
        let count = rewrite_references(spec, ctx.catalog);
        if count > 0 {
            tracing::debug!(
                "{} '{}': {} reference(s) to chart objects",
                document.kind,
                document.name,
                count
            );
        }
    }
    value
}

/// Serialize, prune and splice the volumes block back in
pub(crate) fn render_resource<T: Serialize>(
    document: &ManifestDocument,
    resource: &T,
    volumes: Option<ExtractedVolumes>,
) -> Result<(String, Map<String, JsonValue>)> {
    let text = render::serialize(&document.kind, &document.name, resource)?;
    let text = render::prune_empty_fields(&text);

    match volumes {
        Some(extracted) => Ok((
            render::splice_volumes(&text, &extracted.block)?,
            extracted.persistence,
        )),
        None => Ok((text, Map::new())),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use serde_json::json;

    #[test]
    fn test_legacy_group_is_upgraded() {
        let document = ManifestDocument::from_value(
            "legacy.yaml",
            json!({
                "apiVersion": "extensions/v1beta1",
                "kind": "Deployment",
                "metadata": {"name": "web"},
                "spec": {
                    "selector": {"matchLabels": {"app": "web"}},
                    "template": {"spec": {"containers": [{"name": "nginx"}]}}
                }
            }),
        )
        .unwrap();

        let deployment: Deployment = parse_typed(&document, document.value.clone()).unwrap();
        assert_eq!(deployment.metadata.name.as_deref(), Some("web"));
    }

    #[test]
    fn test_wrong_shape_is_unmarshal_error() {
        let document = ManifestDocument::from_value(
            "broken.yaml",
            json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": "web"},
                "spec": {"replicas": "three"}
            }),
        )
        .unwrap();

        let err = parse_typed::<Deployment>(&document, document.value.clone()).unwrap_err();
        assert!(matches!(err, ConvertError::Unmarshal { .. }));
        assert!(err.is_per_object());
    }
}
