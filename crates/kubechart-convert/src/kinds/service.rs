//! Services

use k8s_openapi::api::core::v1::Service;
use std::net::IpAddr;

use kubechart_core::ManifestDocument;

use super::{ConvertContext, Converted, parse_typed, render_resource};
use crate::error::Result;
use crate::metadata::templatize_object_meta;
use crate::scope::ValueScope;
use crate::selector::release_scope_selector;

/// Allocated addresses are stripped; `None` (headless) is kept
fn is_allocated(ip: &str) -> bool {
    ip.parse::<IpAddr>().is_ok()
}

pub fn convert_service(document: &ManifestDocument, key: &str, _ctx: &ConvertContext<'_>) -> Result<Converted> {
    let mut service: Service = parse_typed(document, document.value.clone())?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut service.metadata, &mut scope);
    service.status = None;

    if let Some(spec) = service.spec.as_mut() {
        if spec.cluster_ip.as_deref().is_some_and(is_allocated) {
            spec.cluster_ip = None;
        }
        if let Some(ips) = spec.cluster_ips.as_mut() {
            ips.retain(|ip| !is_allocated(ip));
            if ips.is_empty() {
                spec.cluster_ips = None;
            }
        }

        spec.health_check_node_port = None;
        for port in spec.ports.iter_mut().flatten() {
            port.node_port = None;
        }

        if let Some(kind) = spec.type_.take() {
            spec.type_ = Some(scope.externalize("type", kind));
        }
        if let Some(selector) = spec.selector.as_mut() {
            release_scope_selector(selector);
        }
    }

    let (template, _) = render_resource(document, &service, None)?;
    Ok(Converted {
        template,
        values: scope.into_values(),
        persistence: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::convert;

    #[test]
    fn test_service_is_portable() {
        let converted = convert(
            r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: default
  resourceVersion: "1234"
spec:
  type: NodePort
  clusterIP: 10.96.12.7
  clusterIPs:
  - 10.96.12.7
  ports:
  - port: 80
    targetPort: 8080
    nodePort: 31380
    protocol: TCP
  selector:
    app: web
status:
  loadBalancer: {}
"#,
        );
        let template = &converted.template;

        assert!(!template.contains("clusterIP"));
        assert!(!template.contains("10.96.12.7"));
        assert!(!template.contains("nodePort"));
        assert!(!template.contains("status"));
        assert!(template.contains("{{ .Release.Name }}-web"));
        assert!(template.contains("{{ .Values.web.name }}"));
        assert!(template.contains("{{ .Values.web.type }}"));
        assert!(template.contains("targetPort: 8080"));
        assert_eq!(converted.values["name"], "web");
        assert_eq!(converted.values["type"], "NodePort");
        assert!(converted.persistence.is_empty());
    }

    #[test]
    fn test_headless_service_keeps_cluster_ip() {
        let converted = convert(
            r#"
apiVersion: v1
kind: Service
metadata:
  name: db-headless
spec:
  clusterIP: None
  ports:
  - port: 5432
  selector:
    app: db
"#,
        );
        assert!(converted.template.contains("clusterIP: None"));
        assert!(converted.values.get("type").is_none());
    }
}
