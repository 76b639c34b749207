//! Storage claim volumes and the shared persistence toggles
//!
//! Each claim-backed volume of a pod spec becomes a conditional block: the
//! claim when `persistence.<claim>.enabled` is set, an `emptyDir` otherwise.
//! Helm's conditionals have no place in the typed model, so the whole
//! volumes list is rendered as text and spliced back at a sentinel volume.

use k8s_openapi::api::core::v1::{PersistentVolumeClaimVolumeSource, Volume};
use serde_json::{Map, Value as JsonValue};

use kubechart_core::values::PERSISTENCE;

use crate::catalog::{CLAIM_KIND, ObjectCatalog};
use crate::error::Result;
use crate::key::safe_key;
use crate::scope::ValueScope;

/// Name of the placeholder volume marking where the block is spliced
pub const VOLUMES_ANCHOR: &str = "__kubechart_volumes__";

/// Raw volumes block plus the persistence entries it references
#[derive(Debug, Clone)]
pub struct ExtractedVolumes {
    pub block: String,
    pub persistence: Map<String, JsonValue>,
}

/// Pull claim-backed volumes out of a pod spec
///
/// Returns `None` and leaves the list untouched when no volume is backed by a
/// claim. Otherwise the list is replaced by the sentinel volume.
pub fn extract_volumes(
    volumes: &mut Option<Vec<Volume>>,
    catalog: &ObjectCatalog,
) -> Result<Option<ExtractedVolumes>> {
    let Some(list) = volumes.as_ref() else {
        return Ok(None);
    };
    if !list.iter().any(|v| v.persistent_volume_claim.is_some()) {
        return Ok(None);
    }

    let mut block = String::new();
    let mut persistence = Map::new();

    for volume in list {
        match &volume.persistent_volume_claim {
            Some(claim) => {
                let (claim_key, scope) = claim_scope(claim, catalog);
                block.push_str(&claim_block(&volume.name, &scope));
                let entry = persistence
                    .entry(claim_key)
                    .or_insert_with(|| JsonValue::Object(Map::new()));
                if let JsonValue::Object(fields) = entry {
                    fields.extend(scope.into_values());
                }
            }
            None => block.push_str(&list_item(&serde_yaml::to_string(volume)?)),
        }
    }

    *volumes = Some(vec![Volume {
        name: VOLUMES_ANCHOR.to_string(),
        ..Default::default()
    }]);

    Ok(Some(ExtractedVolumes { block, persistence }))
}

/// Claims created by the chart share the claim object's toggle and `name`.
/// Claims that already exist in the cluster are keyed by the claim name and
/// carry a `claimName`, so pods mounting the same claim share one toggle.
fn claim_scope(
    claim: &PersistentVolumeClaimVolumeSource,
    catalog: &ObjectCatalog,
) -> (String, ValueScope) {
    let (claim_key, field) = match catalog.key_of(CLAIM_KIND, &claim.claim_name) {
        Some(key) => (key.to_string(), "name"),
        None => {
            let key = catalog
                .external_claim_key(&claim.claim_name)
                .map_or_else(|| safe_key(&claim.claim_name), str::to_string);
            (key, "claimName")
        }
    };

    let mut scope = ValueScope::new(format!("{PERSISTENCE}.{claim_key}"));
    scope.record("enabled", true);
    scope.record(field, claim.claim_name.clone());
    if claim.read_only == Some(true) {
        scope.record("readOnly", true);
    }
    (claim_key, scope)
}

fn claim_block(volume_name: &str, scope: &ValueScope) -> String {
    let field = if scope.get("name").is_some() { "name" } else { "claimName" };

    let mut block = format!(
        "- name: {volume_name}\n\
         {{{{- if {} }}}}\n  \
         persistentVolumeClaim:\n    \
         claimName: {}\n",
        scope.value_path("enabled"),
        scope.reference(field),
    );
    if scope.get("readOnly").is_some() {
        block.push_str(&format!("    readOnly: {}\n", scope.reference("readOnly")));
    }
    block.push_str("{{- else }}\n  emptyDir: {}\n{{- end }}\n");
    block
}

/// Turn a serialized mapping into a list item
fn list_item(mapping: &str) -> String {
    let mut item = String::with_capacity(mapping.len() + 8);
    for (i, line) in mapping.lines().enumerate() {
        item.push_str(if i == 0 { "- " } else { "  " });
        item.push_str(line);
        item.push('\n');
    }
    item
}
