//! Label selector consistency
//!
//! A workload's selector, its pod template labels and its own labels must
//! agree on every key the selector constrains. Matching values are prefixed
//! with the release name in all three places so two releases of the same
//! chart never select each other's pods.

use std::collections::BTreeMap;

use crate::scope::release_scoped;

type Labels = BTreeMap<String, String>;

/// What happened to a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPatch {
    /// Nothing to rewrite
    Unchanged,
    /// Number of selector entries rewritten
    Rewritten(usize),
    /// A template label had no counterpart among the object labels
    Aborted { key: String },
}

/// Release-scope a workload selector together with the labels it matches
///
/// Keys absent from the template labels are left alone. If a key is in the
/// template labels but not in the object labels, nothing is changed at all.
pub fn patch_label_selector(
    match_labels: Option<&mut Labels>,
    template_labels: Option<&mut Labels>,
    object_labels: Option<&mut Labels>,
) -> SelectorPatch {
    let Some(match_labels) = match_labels.filter(|m| !m.is_empty()) else {
        return SelectorPatch::Unchanged;
    };
    let Some(template_labels) = template_labels else {
        return SelectorPatch::Unchanged;
    };

    // Decide first, rewrite after, so an abort leaves every map untouched
    let mut rewrites = Vec::new();
    for (key, value) in match_labels.iter() {
        if !template_labels.contains_key(key) {
            continue;
        }
        let in_object = object_labels
            .as_ref()
            .is_some_and(|labels| labels.contains_key(key));
        if !in_object {
            tracing::debug!("selector key '{}' missing from object labels, not patching", key);
            return SelectorPatch::Aborted { key: key.clone() };
        }
        rewrites.push((key.clone(), release_scoped(value)));
    }

    if rewrites.is_empty() {
        return SelectorPatch::Unchanged;
    }

    let Some(object_labels) = object_labels else {
        return SelectorPatch::Unchanged;
    };
    for (key, value) in &rewrites {
        match_labels.insert(key.clone(), value.clone());
        template_labels.insert(key.clone(), value.clone());
        object_labels.insert(key.clone(), value.clone());
    }
    SelectorPatch::Rewritten(rewrites.len())
}

/// Release-scope every value of a service selector
pub fn release_scope_selector(selector: &mut Labels) {
    for value in selector.values_mut() {
        *value = release_scoped(value);
    }
}
