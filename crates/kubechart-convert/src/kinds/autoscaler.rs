//! Horizontal pod autoscalers
//!
//! `autoscaling/v1` carries a CPU target; anything else is read as
//! `autoscaling/v2`. Replica bounds are integers, so they are spliced.

use k8s_openapi::api::autoscaling::{v1, v2};
use serde_json::{Map, Value as JsonValue};

use kubechart_core::ManifestDocument;

use super::{ConvertContext, Converted, parse_typed, render_resource};
use crate::error::Result;
use crate::metadata::templatize_object_meta;
use crate::render::splice_value;
use crate::scope::ValueScope;

const V1: &str = "autoscaling/v1";

/// Point the scale target at the workload's `name` value when it is in the chart
fn rewrite_scale_target(value: &mut JsonValue, ctx: &ConvertContext<'_>) {
    let Some(target) = value.pointer_mut("/spec/scaleTargetRef") else {
        return;
    };
    let kind = target.get("kind").and_then(JsonValue::as_str).unwrap_or_default();
    let name = target.get("name").and_then(JsonValue::as_str).unwrap_or_default();
    if let Some(key) = ctx.catalog.key_of(kind, name) {
        let reference = ValueScope::new(key).reference("name");
        target["name"] = JsonValue::String(reference);
    }
}

pub fn convert_horizontal_pod_autoscaler(
    document: &ManifestDocument,
    key: &str,
    ctx: &ConvertContext<'_>,
) -> Result<Converted> {
    let mut scope = ValueScope::new(key);
    let mut value = document.value.clone();
    rewrite_scale_target(&mut value, ctx);

    let template = match document.api_version() {
        None | Some(V1) => {
            let mut hpa: v1::HorizontalPodAutoscaler = parse_typed(document, value)?;
            templatize_object_meta(&mut hpa.metadata, &mut scope);
            hpa.status = None;

            let (mut template, _) = render_resource(document, &hpa, None)?;
            if let Some(spec) = hpa.spec.as_ref() {
                if let Some(min) = spec.min_replicas {
                    splice_value(&mut template, "spec/minReplicas", &mut scope, "minReplicas", min);
                }
                splice_value(&mut template, "spec/maxReplicas", &mut scope, "maxReplicas", spec.max_replicas);
                if let Some(target) = spec.target_cpu_utilization_percentage {
                    splice_value(
                        &mut template,
                        "spec/targetCPUUtilizationPercentage",
                        &mut scope,
                        "targetCPUUtilizationPercentage",
                        target,
                    );
                }
            }
            template
        }
        Some(_) => {
            let mut hpa: v2::HorizontalPodAutoscaler = parse_typed(document, value)?;
            templatize_object_meta(&mut hpa.metadata, &mut scope);
            hpa.status = None;

            let (mut template, _) = render_resource(document, &hpa, None)?;
            if let Some(spec) = hpa.spec.as_ref() {
                if let Some(min) = spec.min_replicas {
                    splice_value(&mut template, "spec/minReplicas", &mut scope, "minReplicas", min);
                }
                splice_value(&mut template, "spec/maxReplicas", &mut scope, "maxReplicas", spec.max_replicas);
            }
            template
        }
    };

    Ok(Converted {
        template,
        values: scope.into_values(),
        persistence: Map::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::load;
    use super::*;
    use crate::registry::KindRegistry;

    const MANIFESTS: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api-server
spec:
  selector:
    matchLabels:
      app: api
  template:
    metadata:
      labels:
        app: api
    spec:
      containers:
      - name: api
        image: api:1.0
---
apiVersion: autoscaling/v1
kind: HorizontalPodAutoscaler
metadata:
  name: api
spec:
  minReplicas: 2
  maxReplicas: 10
  targetCPUUtilizationPercentage: 75
  scaleTargetRef:
    apiVersion: apps/v1
    kind: Deployment
    name: api-server
---
apiVersion: autoscaling/v2
kind: HorizontalPodAutoscaler
metadata:
  name: worker
spec:
  maxReplicas: 4
  scaleTargetRef:
    apiVersion: apps/v1
    kind: Deployment
    name: worker
  metrics:
  - type: Resource
    resource:
      name: cpu
      target:
        type: Utilization
        averageUtilization: 60
"#;

    fn convert_at(index: usize) -> Converted {
        let (catalog, documents) = load(MANIFESTS);
        let registry = KindRegistry::default();
        let key = catalog.entry(index).unwrap().key.clone();
        let pipeline = registry.get(&documents[index].kind).unwrap();
        (pipeline.convert)(&documents[index], &key, &ConvertContext::new(&catalog)).unwrap()
    }

    #[test]
    fn test_v1_bounds_and_target() {
        let converted = convert_at(1);
        let template = &converted.template;

        assert!(template.contains("minReplicas: {{ .Values.api.minReplicas }}"));
        assert!(template.contains("maxReplicas: {{ .Values.api.maxReplicas }}"));
        assert!(template.contains("targetCPUUtilizationPercentage: {{ .Values.api.targetCPUUtilizationPercentage }}"));
        assert!(template.contains("{{ .Values.apiServer.name }}"));
        assert_eq!(converted.values["minReplicas"], 2);
        assert_eq!(converted.values["maxReplicas"], 10);
        assert_eq!(converted.values["targetCPUUtilizationPercentage"], 75);
    }

    #[test]
    fn test_v2_keeps_metrics() {
        let converted = convert_at(2);
        let template = &converted.template;

        assert!(template.starts_with("apiVersion: autoscaling/v2\n"));
        assert!(template.contains("maxReplicas: {{ .Values.worker.maxReplicas }}"));
        assert!(template.contains("averageUtilization: 60"));
        assert!(template.contains("name: worker"));
        assert!(converted.values.get("minReplicas").is_none());
        assert_eq!(converted.values["maxReplicas"], 4);
    }
}
