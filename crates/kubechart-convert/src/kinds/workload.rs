//! Pod-bearing workloads

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Pod, PodTemplateSpec, ReplicationController};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use kubechart_core::ManifestDocument;

use super::{ConvertContext, Converted, parse_typed, render_resource, with_references};
use crate::error::Result;
use crate::metadata::{clean_object_meta, clean_template_meta, strip_decorators, templatize_object_meta};
use crate::pod::templatize_pod_spec;
use crate::render::splice_value;
use crate::scope::ValueScope;
use crate::selector::{SelectorPatch, patch_label_selector};
use crate::volume::ExtractedVolumes;

const POD_SPEC: &str = "/spec";
const POD_TEMPLATE_SPEC: &str = "/spec/template/spec";

type Labels = BTreeMap<String, String>;

fn templatize_template(
    template: &mut PodTemplateSpec,
    scope: &mut ValueScope,
    ctx: &ConvertContext<'_>,
) -> Result<Option<ExtractedVolumes>> {
    clean_template_meta(&mut template.metadata);
    match template.spec.as_mut() {
        Some(spec) => templatize_pod_spec(spec, scope, ctx.catalog),
        None => Ok(None),
    }
}

fn template_labels(template: &mut PodTemplateSpec) -> Option<&mut Labels> {
    template.metadata.as_mut().and_then(|meta| meta.labels.as_mut())
}

fn patch_selector(
    document: &ManifestDocument,
    match_labels: &mut Option<Labels>,
    template_labels: Option<&mut Labels>,
    object_labels: Option<&mut Labels>,
) {
    strip_decorators(match_labels);
    match patch_label_selector(match_labels.as_mut(), template_labels, object_labels) {
        SelectorPatch::Aborted { key } => tracing::warn!(
            "{} '{}': selector key '{}' is not among the object labels, selector left as is",
            document.kind,
            document.name,
            key
        ),
        SelectorPatch::Rewritten(count) => tracing::debug!(
            "{} '{}': {} selector label(s) scoped to the release",
            document.kind,
            document.name,
            count
        ),
        SelectorPatch::Unchanged => {}
    }
}

fn finish(
    document: &ManifestDocument,
    template: String,
    scope: ValueScope,
    persistence: serde_json::Map<String, JsonValue>,
) -> Converted {
    tracing::debug!("{} '{}' templatized under '{}'", document.kind, document.name, scope.path());
    Converted {
        template,
        values: scope.into_values(),
        persistence,
    }
}

pub fn convert_pod(document: &ManifestDocument, key: &str, ctx: &ConvertContext<'_>) -> Result<Converted> {
    let value = with_references(document, POD_SPEC, ctx);
    let mut pod: Pod = parse_typed(document, value)?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut pod.metadata, &mut scope);
    pod.status = None;

    let volumes = match pod.spec.as_mut() {
        Some(spec) => templatize_pod_spec(spec, &mut scope, ctx.catalog)?,
        None => None,
    };

    let (template, persistence) = render_resource(document, &pod, volumes)?;
    Ok(finish(document, template, scope, persistence))
}

pub fn convert_replication_controller(
    document: &ManifestDocument,
    key: &str,
    ctx: &ConvertContext<'_>,
) -> Result<Converted> {
    let value = with_references(document, POD_TEMPLATE_SPEC, ctx);
    let mut rc: ReplicationController = parse_typed(document, value)?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut rc.metadata, &mut scope);
    rc.status = None;

    let mut volumes = None;
    let mut replicas = None;
    if let Some(spec) = rc.spec.as_mut() {
        replicas = spec.replicas;
        if let Some(template) = spec.template.as_mut() {
            volumes = templatize_template(template, &mut scope, ctx)?;
            patch_selector(
                document,
                &mut spec.selector,
                template_labels(template),
                rc.metadata.labels.as_mut(),
            );
        }
    }

    let (mut template, persistence) = render_resource(document, &rc, volumes)?;
    if let Some(replicas) = replicas {
        splice_value(&mut template, "spec/replicas", &mut scope, "replicas", replicas);
    }
    Ok(finish(document, template, scope, persistence))
}

pub fn convert_deployment(document: &ManifestDocument, key: &str, ctx: &ConvertContext<'_>) -> Result<Converted> {
    let value = with_references(document, POD_TEMPLATE_SPEC, ctx);
    let mut deployment: Deployment = parse_typed(document, value)?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut deployment.metadata, &mut scope);
    deployment.status = None;

    let mut volumes = None;
    let mut replicas = None;
    if let Some(spec) = deployment.spec.as_mut() {
        replicas = spec.replicas;
        volumes = templatize_template(&mut spec.template, &mut scope, ctx)?;

        if let Some(strategy) = spec.strategy.as_mut()
            && let Some(kind) = strategy.type_.take()
        {
            strategy.type_ = Some(scope.externalize("strategyType", kind));
        }

        patch_selector(
            document,
            &mut spec.selector.match_labels,
            template_labels(&mut spec.template),
            deployment.metadata.labels.as_mut(),
        );
    }

    let (mut template, persistence) = render_resource(document, &deployment, volumes)?;
    if let Some(replicas) = replicas {
        splice_value(&mut template, "spec/replicas", &mut scope, "replicas", replicas);
    }
    Ok(finish(document, template, scope, persistence))
}

pub fn convert_replica_set(document: &ManifestDocument, key: &str, ctx: &ConvertContext<'_>) -> Result<Converted> {
    let value = with_references(document, POD_TEMPLATE_SPEC, ctx);
    let mut replica_set: ReplicaSet = parse_typed(document, value)?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut replica_set.metadata, &mut scope);
    replica_set.status = None;

    let mut volumes = None;
    let mut replicas = None;
    if let Some(spec) = replica_set.spec.as_mut() {
        replicas = spec.replicas;
        match spec.template.as_mut() {
            Some(template) => {
                volumes = templatize_template(template, &mut scope, ctx)?;
                patch_selector(
                    document,
                    &mut spec.selector.match_labels,
                    template_labels(template),
                    replica_set.metadata.labels.as_mut(),
                );
            }
            None => strip_decorators(&mut spec.selector.match_labels),
        }
    }

    let (mut template, persistence) = render_resource(document, &replica_set, volumes)?;
    if let Some(replicas) = replicas {
        splice_value(&mut template, "spec/replicas", &mut scope, "replicas", replicas);
    }
    Ok(finish(document, template, scope, persistence))
}

pub fn convert_stateful_set(document: &ManifestDocument, key: &str, ctx: &ConvertContext<'_>) -> Result<Converted> {
    let mut scope = ValueScope::new(key);
    let mut value = with_references(document, POD_TEMPLATE_SPEC, ctx);

    // Rewritten on the raw tree, before the typed read
    if let Some(JsonValue::String(service_name)) = value.pointer_mut("/spec/serviceName")
        && !service_name.is_empty()
    {
        let original = std::mem::take(service_name);
        *service_name = scope.externalize("serviceName", original);
    }

    let mut stateful_set: StatefulSet = parse_typed(document, value)?;
    templatize_object_meta(&mut stateful_set.metadata, &mut scope);
    stateful_set.status = None;

    let mut volumes = None;
    let mut replicas = None;
    if let Some(spec) = stateful_set.spec.as_mut() {
        replicas = spec.replicas;
        volumes = templatize_template(&mut spec.template, &mut scope, ctx)?;

        if let Some(strategy) = spec.update_strategy.as_mut()
            && let Some(kind) = strategy.type_.take()
        {
            strategy.type_ = Some(scope.externalize("updateStrategyType", kind));
        }

        for claim in spec.volume_claim_templates.iter_mut().flatten() {
            clean_object_meta(&mut claim.metadata);
            claim.status = None;
        }

        patch_selector(
            document,
            &mut spec.selector.match_labels,
            template_labels(&mut spec.template),
            stateful_set.metadata.labels.as_mut(),
        );
    }

    let (mut template, persistence) = render_resource(document, &stateful_set, volumes)?;
    if let Some(replicas) = replicas {
        splice_value(&mut template, "spec/replicas", &mut scope, "replicas", replicas);
    }
    Ok(finish(document, template, scope, persistence))
}

pub fn convert_job(document: &ManifestDocument, key: &str, ctx: &ConvertContext<'_>) -> Result<Converted> {
    let value = with_references(document, POD_TEMPLATE_SPEC, ctx);
    let mut job: Job = parse_typed(document, value)?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut job.metadata, &mut scope);
    job.status = None;

    let mut volumes = None;
    if let Some(spec) = job.spec.as_mut() {
        volumes = templatize_template(&mut spec.template, &mut scope, ctx)?;

        // The controller generates a uid selector; once stripped there is
        // nothing left to keep and the new Job gets a fresh one
        if let Some(selector) = spec.selector.as_mut() {
            strip_decorators(&mut selector.match_labels);
            let no_expressions = selector
                .match_expressions
                .as_ref()
                .is_none_or(|expressions| expressions.is_empty());
            if selector.match_labels.is_none() && no_expressions {
                spec.selector = None;
                spec.manual_selector = None;
            }
        }

        if let Some(selector) = spec.selector.as_mut() {
            patch_selector(
                document,
                &mut selector.match_labels,
                template_labels(&mut spec.template),
                job.metadata.labels.as_mut(),
            );
        }
    }

    let (template, persistence) = render_resource(document, &job, volumes)?;
    Ok(finish(document, template, scope, persistence))
}

pub fn convert_daemon_set(document: &ManifestDocument, key: &str, ctx: &ConvertContext<'_>) -> Result<Converted> {
    let value = with_references(document, POD_TEMPLATE_SPEC, ctx);
    let mut daemon_set: DaemonSet = parse_typed(document, value)?;
    let mut scope = ValueScope::new(key);

    templatize_object_meta(&mut daemon_set.metadata, &mut scope);
    daemon_set.status = None;

    let mut volumes = None;
    if let Some(spec) = daemon_set.spec.as_mut() {
        volumes = templatize_template(&mut spec.template, &mut scope, ctx)?;

        if let Some(strategy) = spec.update_strategy.as_mut()
            && let Some(kind) = strategy.type_.take()
        {
            strategy.type_ = Some(scope.externalize("updateStrategyType", kind));
        }

        patch_selector(
            document,
            &mut spec.selector.match_labels,
            template_labels(&mut spec.template),
            daemon_set.metadata.labels.as_mut(),
        );
    }

    let (template, persistence) = render_resource(document, &daemon_set, volumes)?;
    Ok(finish(document, template, scope, persistence))
}
