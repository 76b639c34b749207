//! Template-safe keys derived from resource names
//!
//! Keys are used both as the values namespace of an object and as a path
//! segment inside `{{ .Values.<key>.<field> }}`, so they must be valid Go
//! template identifiers: ASCII letters, digits and `_`, not starting with a
//! digit.

use std::collections::BTreeSet;

/// Key used when a name sanitizes to nothing
pub const FALLBACK_KEY: &str = "unnamed";

/// Names the engine or Helm already uses at the top of the values tree
pub const RESERVED_KEYS: &[&str] = &["persistence", "global", "Values", "Release", "Chart"];

/// Derive a template-safe key from an arbitrary name
///
/// `my-app` becomes `myApp`, `nginx.conf` becomes `nginxConf`, `.dockercfg`
/// becomes `dockercfg`. The mapping is deterministic.
pub fn safe_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());

    let segments = name
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty());

    for segment in segments {
        if key.is_empty() {
            key.push_str(segment);
        } else {
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                key.push(first.to_ascii_uppercase());
                key.push_str(chars.as_str());
            }
        }
    }

    if key.is_empty() {
        return FALLBACK_KEY.to_string();
    }
    if key.starts_with(|c: char| c.is_ascii_digit()) {
        key.insert(0, 'x');
    }
    if RESERVED_KEYS.contains(&key.as_str()) {
        key.push('_');
    }
    key
}

/// Hands out unique keys within one namespace
///
/// The first object with a given sanitized name keeps the bare key. Later
/// objects are qualified with their kind, then numbered.
#[derive(Debug, Default, Clone)]
pub struct KeyAllocator {
    used: BTreeSet<String>,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a key for `name`, qualifying it with `kind` on collision
    pub fn allocate(&mut self, name: &str, kind: &str) -> String {
        let base = safe_key(name);
        if self.used.insert(base.clone()) {
            return base;
        }

        let qualified = format!("{base}{kind}");
        if self.used.insert(qualified.clone()) {
            tracing::warn!(
                "key '{}' already taken, using '{}' for {} '{}'",
                base,
                qualified,
                kind,
                name
            );
            return qualified;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{qualified}{n}");
            if self.used.insert(candidate.clone()) {
                tracing::warn!(
                    "key '{}' already taken, using '{}' for {} '{}'",
                    base,
                    candidate,
                    kind,
                    name
                );
                return candidate;
            }
            n += 1;
        }
    }
}
