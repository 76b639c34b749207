//! Claims, volumes and storage classes

use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use serde_json::{Map, Value as JsonValue};

use kubechart_core::ManifestDocument;
use kubechart_core::values::PERSISTENCE;

use super::{ConvertContext, Converted, parse_typed, render_resource};
use crate::error::Result;
use crate::metadata::templatize_object_meta;
use crate::render::wrap_conditional;
use crate::scope::ValueScope;

const STORAGE: &str = "storage";

/// A claim lives under `persistence.<key>` and is only rendered when its
/// `enabled` toggle is set; pods mounting it share the same toggle.
pub fn convert_persistent_volume_claim(
    document: &ManifestDocument,
    key: &str,
    _ctx: &ConvertContext<'_>,
) -> Result<Converted> {
    let mut claim: PersistentVolumeClaim = parse_typed(document, document.value.clone())?;
    let mut scope = ValueScope::new(format!("{PERSISTENCE}.{key}"));

    templatize_object_meta(&mut claim.metadata, &mut scope);
    claim.status = None;

    if let Some(spec) = claim.spec.as_mut() {
        spec.volume_name = None;

        let requested = spec
            .resources
            .as_mut()
            .and_then(|resources| resources.requests.as_mut())
            .and_then(|requests| requests.get_mut(STORAGE));
        if let Some(size) = requested {
            let original = std::mem::take(&mut size.0);
            size.0 = scope.externalize("size", original);
        }

        if let Some(class) = spec.storage_class_name.take() {
            spec.storage_class_name = Some(scope.externalize("storageClass", class));
        }

        if let Some(modes) = spec.access_modes.as_mut()
            && let [mode] = modes.as_mut_slice()
        {
            let original = std::mem::take(mode);
            *mode = scope.externalize("accessMode", original);
        }
    }

    scope.record("enabled", true);
    let (text, _) = render_resource(document, &claim, None)?;
    let template = wrap_conditional(&text, &scope.value_path("enabled"));

    let mut persistence = Map::new();
    persistence.insert(key.to_string(), JsonValue::Object(scope.into_values()));
    Ok(Converted {
        template,
        values: Map::new(),
        persistence,
    })
}

pub fn convert_persistent_volume(document: &ManifestDocument, key: &str, _ctx: &ConvertContext<'_>) -> Result<Converted> {
    let mut volume: PersistentVolume = parse_typed(document, document.value.clone())?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut volume.metadata, &mut scope);
    volume.status = None;

    if let Some(spec) = volume.spec.as_mut() {
        spec.claim_ref = None;

        if let Some(size) = spec.capacity.as_mut().and_then(|c| c.get_mut(STORAGE)) {
            let original = std::mem::take(&mut size.0);
            size.0 = scope.externalize("size", original);
        }
        if let Some(policy) = spec.persistent_volume_reclaim_policy.take() {
            spec.persistent_volume_reclaim_policy = Some(scope.externalize("reclaimPolicy", policy));
        }
        if let Some(class) = spec.storage_class_name.take() {
            spec.storage_class_name = Some(scope.externalize("storageClass", class));
        }
    }

    let (template, _) = render_resource(document, &volume, None)?;
    Ok(Converted {
        template,
        values: scope.into_values(),
        persistence: Map::new(),
    })
}

pub fn convert_storage_class(document: &ManifestDocument, key: &str, _ctx: &ConvertContext<'_>) -> Result<Converted> {
    let mut class: StorageClass = parse_typed(document, document.value.clone())?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut class.metadata, &mut scope);

    let provisioner = std::mem::take(&mut class.provisioner);
    class.provisioner = scope.externalize("provisioner", provisioner);

    if let Some(parameters) = class.parameters.as_mut() {
        let mut params = scope.child("params");
        for (name, value) in parameters.iter_mut() {
            let field = params.free_field(name);
            let original = std::mem::take(value);
            *value = params.externalize(&field, original);
        }
        scope.adopt("params", params);
    }

    let (template, _) = render_resource(document, &class, None)?;
    Ok(Converted {
        template,
        values: scope.into_values(),
        persistence: Map::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::convert;

    #[test]
    fn test_claim_is_wrapped_in_its_toggle() {
        let converted = convert(
            r#"
apiVersion: v1
kind: PersistentVolumeClaim
metadata:
  name: web-data
  annotations:
    pv.kubernetes.io/bind-completed: "yes"
    volume.kubernetes.io/storage-provisioner: rancher.io/local-path
  finalizers:
  - kubernetes.io/pvc-protection
spec:
  accessModes:
  - ReadWriteOnce
  resources:
    requests:
      storage: 5Gi
  storageClassName: standard
  volumeName: pvc-8d1c
status:
  phase: Bound
"#,
        );
        let template = &converted.template;

        assert!(template.starts_with("{{- if .Values.persistence.webData.enabled }}\n"));
        assert!(template.ends_with("{{- end }}\n"));
        assert!(template.contains("{{ .Values.persistence.webData.size }}"));
        assert!(template.contains("{{ .Values.persistence.webData.storageClass }}"));
        assert!(template.contains("{{ .Values.persistence.webData.accessMode }}"));
        assert!(template.contains("{{ .Values.persistence.webData.name }}"));
        for stripped in ["volumeName", "pvc-8d1c", "bind-completed", "finalizers", "status"] {
            assert!(!template.contains(stripped), "{stripped} should be stripped");
        }

        assert!(converted.values.is_empty());
        let entry = &converted.persistence["webData"];
        assert_eq!(entry["enabled"], true);
        assert_eq!(entry["size"], "5Gi");
        assert_eq!(entry["storageClass"], "standard");
        assert_eq!(entry["accessMode"], "ReadWriteOnce");
        assert_eq!(entry["name"], "web-data");
    }

    #[test]
    fn test_persistent_volume() {
        let converted = convert(
            r#"
apiVersion: v1
kind: PersistentVolume
metadata:
  name: pv-0001
spec:
  capacity:
    storage: 10Gi
  accessModes:
  - ReadWriteOnce
  persistentVolumeReclaimPolicy: Retain
  storageClassName: manual
  hostPath:
    path: /mnt/data
  claimRef:
    name: web-data
    namespace: default
"#,
        );
        assert!(!converted.template.contains("claimRef"));
        assert!(converted.template.contains("{{ .Values.pv0001.size }}"));
        assert_eq!(converted.values["size"], "10Gi");
        assert_eq!(converted.values["reclaimPolicy"], "Retain");
        assert_eq!(converted.values["storageClass"], "manual");
    }

    #[test]
    fn test_storage_class_parameters() {
        let converted = convert(
            r#"
apiVersion: storage.k8s.io/v1
kind: StorageClass
metadata:
  name: fast
provisioner: kubernetes.io/aws-ebs
parameters:
  type: gp3
  iopsPerGB: "10"
"#,
        );
        assert!(converted.template.contains("{{ .Values.fast.provisioner }}"));
        assert!(converted.template.contains("{{ .Values.fast.params.type }}"));
        assert_eq!(converted.values["provisioner"], "kubernetes.io/aws-ebs");
        assert_eq!(converted.values["params"]["iopsPerGB"], "10");
    }
}
