//! Raw data blocks for ConfigMaps and Secrets
//!
//! Data entries are rendered as text and appended after serialization. The
//! entry keys stay as they are in the cluster while the values path uses a
//! sanitized field name, so `.dockercfg` is read from `.Values.<key>.dockercfg`.

use base64::Engine as _;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

use crate::scope::ValueScope;

/// Fallback for secret data that is not supplied at install time
pub const RANDOM_FALLBACK: &str = "{{ randAlphaNum 10 | b64enc | quote }}";

/// Render a Secret's `data` section
///
/// Each entry uses the supplied value when set and a random encoded string
/// otherwise. Defaults keep the base64 data exported from the cluster.
pub fn secret_data_block(data: &BTreeMap<String, ByteString>, scope: &mut ValueScope) -> String {
    let mut block = String::from("data:\n");
    for (entry, bytes) in data {
        let field = scope.free_field(entry);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes.0);
        scope.record(&field, encoded);
        let path = scope.value_path(&field);

        block.push_str(&format!("  {{{{- if {path} }}}}\n"));
        block.push_str(&format!("  {entry}: {{{{ {path} | quote }}}}\n"));
        block.push_str("  {{- else }}\n");
        block.push_str(&format!("  {entry}: {RANDOM_FALLBACK}\n"));
        block.push_str("  {{- end }}\n");
    }
    block
}

/// Render a `data:`/`stringData:` section of plain text entries
///
/// Values are piped through `quote` so multi-line or numeric-looking text
/// survives rendering as a string.
pub fn quoted_block(section: &str, data: &BTreeMap<String, String>, scope: &mut ValueScope) -> String {
    let mut block = format!("{section}:\n");
    for (entry, text) in data {
        let field = scope.free_field(entry);
        scope.record(&field, text.clone());
        block.push_str(&format!("  {}: {{{{ {} | quote }}}}\n", entry, scope.value_path(&field)));
    }
    block
}
