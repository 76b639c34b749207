//! Value scopes: where externalized defaults are recorded
//!
//! A scope is a path into the values tree (`web`, `web.nginx`,
//! `persistence.data`). Externalizing a field records its default under the
//! scope and returns the template reference that resolves to it, so every
//! reference handed out has a matching entry.

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

use crate::key::safe_key;

/// Reference to the release name, used to scope labels per install
pub const RELEASE_NAME: &str = "{{ .Release.Name }}";

/// Defaults collected for one object (or one nested part of it)
#[derive(Debug, Clone)]
pub struct ValueScope {
    path: String,
    values: Map<String, JsonValue>,
    reserved: BTreeSet<String>,
}

impl ValueScope {
    /// Scope rooted at `path` (an object key or `persistence.<claim>`)
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            values: Map::new(),
            reserved: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dotted path to `field` inside this scope, without template braces
    pub fn value_path(&self, field: &str) -> String {
        format!(".Values.{}.{}", self.path, field)
    }

    /// `{{ .Values.<path>.<field> }}`
    pub fn reference(&self, field: &str) -> String {
        format!("{{{{ {} }}}}", self.value_path(field))
    }

    /// Record `default` under `field` and return the reference to it
    pub fn externalize(&mut self, field: &str, default: impl Into<JsonValue>) -> String {
        let default = default.into();
        if let Some(previous) = self.values.get(field)
            && previous != &default
        {
            tracing::warn!(
                "'{}' in {} is set twice, keeping the last default",
                field,
                self.path
            );
        }
        self.values.insert(field.to_string(), default);
        self.reference(field)
    }

    /// Record a default without producing a reference
    pub fn record(&mut self, field: &str, default: impl Into<JsonValue>) {
        self.values.insert(field.to_string(), default.into());
    }

    /// Keep `fields` away from [`free_field`](Self::free_field)
    ///
    /// For fields the object may still externalize after its nested parts
    /// have picked their names.
    pub fn reserve(&mut self, fields: &[&str]) {
        self.reserved.extend(fields.iter().map(|field| field.to_string()));
    }

    fn is_taken(&self, field: &str) -> bool {
        self.values.contains_key(field) || self.reserved.contains(field)
    }

    /// Unused field name derived from `name` (`nginx.conf` -> `nginxConf`)
    ///
    /// Numbered when the sanitized name is already taken or reserved in this
    /// scope.
    pub fn free_field(&self, name: &str) -> String {
        let base = safe_key(name);
        if !self.is_taken(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}{n}");
            if !self.is_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Empty scope nested under `field`
    pub fn child(&self, field: &str) -> ValueScope {
        ValueScope::new(format!("{}.{}", self.path, field))
    }

    /// Attach a nested scope's defaults under `field`
    pub fn adopt(&mut self, field: &str, child: ValueScope) {
        if child.values.is_empty() {
            return;
        }
        match self.values.get_mut(field) {
            Some(JsonValue::Object(existing)) => existing.extend(child.values),
            _ => {
                self.values
                    .insert(field.to_string(), JsonValue::Object(child.values));
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.values.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Map<String, JsonValue> {
        self.values
    }
}

/// Prefix a label value with the release name
pub fn release_scoped(value: &str) -> String {
    let prefix = format!("{RELEASE_NAME}-");
    if value.starts_with(&prefix) {
        value.to_string()
    } else {
        format!("{prefix}{value}")
    }
}
