//! Pod spec templatization shared by every pod-bearing kind

use k8s_openapi::api::core::v1::{Container, PodSpec};
use serde_json::Value as JsonValue;

use crate::catalog::ObjectCatalog;
use crate::error::Result;
use crate::scope::ValueScope;
use crate::volume::{ExtractedVolumes, extract_volumes};

const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Fields a pod-bearing object keeps at the top of its own scope
const OBJECT_FIELDS: &[&str] = &[
    "name",
    "replicas",
    "strategyType",
    "updateStrategyType",
    "serviceName",
    "serviceAccountName",
];

/// Strip scheduling decisions and cluster defaults from a pod spec
pub fn clean_pod_spec(spec: &mut PodSpec) {
    spec.dns_policy = None;
    spec.node_name = None;
    spec.termination_grace_period_seconds = None;

    if spec.service_account_name.as_deref() == Some(DEFAULT_SERVICE_ACCOUNT) {
        spec.service_account_name = None;
    }
    if spec.service_account.as_deref() == Some(DEFAULT_SERVICE_ACCOUNT) {
        spec.service_account = None;
    }

    for container in spec.containers.iter_mut() {
        container.termination_message_path = None;
    }
    for container in spec.init_containers.iter_mut().flatten() {
        container.termination_message_path = None;
    }
}

/// Clean a pod spec, externalize its portable fields and pull out claims
///
/// Container settings are nested under one sub-key per container, never one
/// of the object's own fields. The returned volumes block, if any, must be
/// spliced at the volumes anchor.
pub fn templatize_pod_spec(
    spec: &mut PodSpec,
    scope: &mut ValueScope,
    catalog: &ObjectCatalog,
) -> Result<Option<ExtractedVolumes>> {
    clean_pod_spec(spec);
    scope.reserve(OBJECT_FIELDS);

    if let Some(account) = spec.service_account_name.take() {
        let reference = scope.externalize("serviceAccountName", account.clone());
        if spec.service_account.as_deref() == Some(account.as_str()) {
            spec.service_account = Some(reference.clone());
        }
        spec.service_account_name = Some(reference);
    }

    for container in spec.containers.iter_mut() {
        templatize_container(container, scope);
    }
    for container in spec.init_containers.iter_mut().flatten() {
        templatize_container(container, scope);
    }

    extract_volumes(&mut spec.volumes, catalog)
}

fn templatize_container(container: &mut Container, scope: &mut ValueScope) {
    let field = scope.free_field(&container.name);
    let mut values = scope.child(&field);

    if let Some(image) = container.image.take() {
        let (repository, tag) = split_image(&image);
        let mut reference = values.externalize("image", repository);
        if let Some(tag) = tag {
            reference = format!("{}:{}", reference, values.externalize("imageTag", tag));
        }
        container.image = Some(reference);
    }

    if let Some(policy) = container.image_pull_policy.take() {
        container.image_pull_policy = Some(values.externalize("imagePullPolicy", policy));
    }

    if let Some(env) = container.env.as_mut() {
        let mut env_values = values.child("env");
        for var in env.iter_mut().filter(|var| var.value_from.is_none()) {
            if let Some(literal) = var.value.take() {
                let env_field = env_values.free_field(&var.name);
                var.value = Some(env_values.externalize(&env_field, literal));
            }
        }
        values.adopt("env", env_values);
    }

    scope.adopt(&field, values);
}

/// Split `registry/repo:tag` into repository and tag
///
/// Digest references stay whole. A `:` before the last `/` is a registry port.
pub fn split_image(image: &str) -> (String, Option<String>) {
    if image.contains('@') {
        return (image.to_string(), None);
    }
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(colon) => {
            let split = name_start + colon;
            (image[..split].to_string(), Some(image[split + 1..].to_string()))
        }
        None => (image.to_string(), None),
    }
}

/// Point references to in-chart ConfigMaps and Secrets at their `name` value
///
/// Works on the raw pod spec tree before the typed parse. Returns how many
/// references were rewritten.
pub fn rewrite_references(pod_spec: &mut JsonValue, catalog: &ObjectCatalog) -> usize {
    let mut rewritten = 0;

    for list in ["containers", "initContainers"] {
        let Some(containers) = pod_spec.get_mut(list).and_then(JsonValue::as_array_mut) else {
            continue;
        };
        for container in containers {
            if let Some(env) = container.get_mut("env").and_then(JsonValue::as_array_mut) {
                for var in env {
                    let Some(source) = var.get_mut("valueFrom") else {
                        continue;
                    };
                    rewritten += rewrite(source.get_mut("configMapKeyRef"), "name", "ConfigMap", catalog);
                    rewritten += rewrite(source.get_mut("secretKeyRef"), "name", "Secret", catalog);
                }
            }
            if let Some(env_from) = container.get_mut("envFrom").and_then(JsonValue::as_array_mut) {
                for source in env_from {
                    rewritten += rewrite(source.get_mut("configMapRef"), "name", "ConfigMap", catalog);
                    rewritten += rewrite(source.get_mut("secretRef"), "name", "Secret", catalog);
                }
            }
        }
    }

    if let Some(volumes) = pod_spec.get_mut("volumes").and_then(JsonValue::as_array_mut) {
        for volume in volumes {
            rewritten += rewrite(volume.get_mut("configMap"), "name", "ConfigMap", catalog);
            rewritten += rewrite(volume.get_mut("secret"), "secretName", "Secret", catalog);

            let sources = volume
                .pointer_mut("/projected/sources")
                .and_then(JsonValue::as_array_mut);
            for source in sources.into_iter().flatten() {
                rewritten += rewrite(source.get_mut("configMap"), "name", "ConfigMap", catalog);
                rewritten += rewrite(source.get_mut("secret"), "name", "Secret", catalog);
            }
        }
    }

    if let Some(pull_secrets) = pod_spec.get_mut("imagePullSecrets").and_then(JsonValue::as_array_mut) {
        for secret in pull_secrets {
            rewritten += rewrite(Some(secret), "name", "Secret", catalog);
        }
    }

    rewritten
}

fn rewrite(node: Option<&mut JsonValue>, field: &str, kind: &str, catalog: &ObjectCatalog) -> usize {
    let Some(slot) = node.and_then(|n| n.get_mut(field)) else {
        return 0;
    };
    let Some(key) = slot.as_str().and_then(|name| catalog.key_of(kind, name)) else {
        return 0;
    };
    *slot = JsonValue::String(ValueScope::new(key).reference("name"));
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::KindRegistry;
    use kubechart_core::ManifestDocument;
    use serde_json::json;

    fn pod_spec(value: JsonValue) -> PodSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_split_image() {
        assert_eq!(split_image("nginx"), ("nginx".into(), None));
        assert_eq!(split_image("nginx:1.25"), ("nginx".into(), Some("1.25".into())));
        assert_eq!(
            split_image("registry.local:5000/team/app:v2"),
            ("registry.local:5000/team/app".into(), Some("v2".into()))
        );
        assert_eq!(
            split_image("registry.local:5000/team/app"),
            ("registry.local:5000/team/app".into(), None)
        );
        assert_eq!(
            split_image("nginx@sha256:abcd"),
            ("nginx@sha256:abcd".into(), None)
        );
    }

    #[test]
    fn test_cluster_fields_are_stripped() {
        let mut spec = pod_spec(json!({
            "dnsPolicy": "ClusterFirst",
            "nodeName": "node-3",
            "serviceAccountName": "default",
            "serviceAccount": "default",
            "terminationGracePeriodSeconds": 30,
            "containers": [{"name": "nginx", "terminationMessagePath": "/dev/termination-log"}]
        }));
        clean_pod_spec(&mut spec);

        assert!(spec.dns_policy.is_none());
        assert!(spec.node_name.is_none());
        assert!(spec.service_account_name.is_none());
        assert!(spec.service_account.is_none());
        assert!(spec.termination_grace_period_seconds.is_none());
        assert!(spec.containers[0].termination_message_path.is_none());
    }

    #[test]
    fn test_containers_are_externalized() {
        let mut spec = pod_spec(json!({
            "serviceAccountName": "web-sa",
            "containers": [{
                "name": "nginx",
                "image": "nginx:1.25",
                "imagePullPolicy": "IfNotPresent",
                "env": [
                    {"name": "DB_HOST", "value": "db"},
                    {"name": "POD_IP", "valueFrom": {"fieldRef": {"fieldPath": "status.podIP"}}}
                ]
            }]
        }));
        let mut scope = ValueScope::new("web");
        let volumes = templatize_pod_spec(&mut spec, &mut scope, &ObjectCatalog::default()).unwrap();
        assert!(volumes.is_none());

        let container = &spec.containers[0];
        assert_eq!(
            container.image.as_deref(),
            Some("{{ .Values.web.nginx.image }}:{{ .Values.web.nginx.imageTag }}")
        );
        assert_eq!(
            container.image_pull_policy.as_deref(),
            Some("{{ .Values.web.nginx.imagePullPolicy }}")
        );
        let env = container.env.as_ref().unwrap();
        assert_eq!(env[0].value.as_deref(), Some("{{ .Values.web.nginx.env.DB_HOST }}"));
        assert!(env[1].value.is_none());
        assert_eq!(
            spec.service_account_name.as_deref(),
            Some("{{ .Values.web.serviceAccountName }}")
        );

        let values = scope.into_values();
        assert_eq!(values["nginx"]["image"], "nginx");
        assert_eq!(values["nginx"]["imageTag"], "1.25");
        assert_eq!(values["nginx"]["env"]["DB_HOST"], "db");
        assert_eq!(values["serviceAccountName"], "web-sa");
    }

    #[test]
    fn test_references_to_chart_objects_are_rewritten() {
        let documents = vec![
            ManifestDocument::from_value(
                "in.yaml",
                json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "web-config"}}),
            )
            .unwrap(),
        ];
        let catalog = ObjectCatalog::build(&documents, &KindRegistry::default());

        let mut spec = json!({
            "containers": [{
                "name": "nginx",
                "envFrom": [{"configMapRef": {"name": "web-config"}}, {"secretRef": {"name": "external"}}]
            }],
            "volumes": [{"name": "conf", "configMap": {"name": "web-config"}}]
        });
        let count = rewrite_references(&mut spec, &catalog);

        assert_eq!(count, 2);
        assert_eq!(
            spec["containers"][0]["envFrom"][0]["configMapRef"]["name"],
            "{{ .Values.webConfig.name }}"
        );
        assert_eq!(spec["containers"][0]["envFrom"][1]["secretRef"]["name"], "external");
        assert_eq!(spec["volumes"][0]["configMap"]["name"], "{{ .Values.webConfig.name }}");
    }
}
