//! ConfigMaps and Secrets

use k8s_openapi::api::core::v1::{ConfigMap, Secret};

use kubechart_core::ManifestDocument;

use super::{ConvertContext, Converted, parse_typed, render_resource};
use crate::error::Result;
use crate::metadata::templatize_object_meta;
use crate::render::append_block;
use crate::scope::ValueScope;
use crate::secret::{quoted_block, secret_data_block};

const DEFAULT_SECRET_TYPE: &str = "Opaque";

pub fn convert_config_map(document: &ManifestDocument, key: &str, _ctx: &ConvertContext<'_>) -> Result<Converted> {
    let mut config_map: ConfigMap = parse_typed(document, document.value.clone())?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut config_map.metadata, &mut scope);
    let data = config_map.data.take().unwrap_or_default();

    let (mut template, _) = render_resource(document, &config_map, None)?;
    if !data.is_empty() {
        append_block(&mut template, &quoted_block("data", &data, &mut scope));
    }

    Ok(Converted {
        template,
        values: scope.into_values(),
        persistence: Default::default(),
    })
}

/// Secret data falls back to random values when not supplied
pub fn convert_secret(document: &ManifestDocument, key: &str, _ctx: &ConvertContext<'_>) -> Result<Converted> {
    let mut secret: Secret = parse_typed(document, document.value.clone())?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut secret.metadata, &mut scope);
    let data = secret.data.take().unwrap_or_default();
    let string_data = secret.string_data.take().unwrap_or_default();

    let kind = secret
        .type_
        .take()
        .unwrap_or_else(|| DEFAULT_SECRET_TYPE.to_string());
    secret.type_ = Some(scope.externalize("type", kind));

    let (mut template, _) = render_resource(document, &secret, None)?;
    if !data.is_empty() {
        append_block(&mut template, &secret_data_block(&data, &mut scope));
    }
    if !string_data.is_empty() {
        append_block(&mut template, &quoted_block("stringData", &string_data, &mut scope));
    }

    Ok(Converted {
        template,
        values: scope.into_values(),
        persistence: Default::default(),
    })
}
