//! Serialization and text-level splicing
//!
//! The typed model can hold string references but not integer-typed
//! references, conditionals or random fallbacks. Those are spliced into the
//! serialized YAML at named anchors after the empty-field prune.

use regex::Regex;
use serde::Serialize;

use crate::error::{ConvertError, Result};
use crate::scope::ValueScope;
use crate::volume::VOLUMES_ANCHOR;

/// Serialize a mutated resource to YAML
pub fn serialize<T: Serialize>(kind: &str, name: &str, resource: &T) -> Result<String> {
    serde_yaml::to_string(resource).map_err(|source| ConvertError::Serialize {
        kind: kind.to_string(),
        name: name.to_string(),
        source,
    })
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Mark lines that are the content of a block scalar (`key: |`)
fn block_scalar_content(lines: &[&str]) -> Vec<bool> {
    let header = Regex::new(r"(?:^-|:) [|>][-+0-9]*$").expect("valid regex");
    let mut inside = vec![false; lines.len()];
    let mut header_indent: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(parent) = header_indent {
            if line.trim().is_empty() || indent_of(line) > parent {
                inside[i] = true;
                continue;
            }
            header_indent = None;
        }
        if header.is_match(line.trim()) {
            header_indent = Some(indent_of(line));
        }
    }
    inside
}

/// Remove fields serialized as structural zero values
///
/// Drops `key: {}`, `key: []`, `key: null` and `key: ~` lines, then any
/// mapping key left without children. `emptyDir: {}` is meaningful and kept,
/// as are list items and block scalar content.
pub fn prune_empty_fields(text: &str) -> String {
    let empty_value = Regex::new(r#"^\s*([^\s#'"-][^:]*): (?:\{\}|\[\]|null|~)\s*$"#)
        .expect("valid regex");
    let bare_key = Regex::new(r#"^\s*[^\s#'"-][^:]*:\s*$"#).expect("valid regex");

    let mut lines: Vec<&str> = text.lines().collect();
    let protected = block_scalar_content(&lines);
    lines = lines
        .into_iter()
        .zip(protected)
        .filter(|(line, protected)| {
            *protected
                || !empty_value
                    .captures(line)
                    .is_some_and(|caps| &caps[1] != "emptyDir")
        })
        .map(|(line, _)| line)
        .collect();

    loop {
        let protected = block_scalar_content(&lines);
        let doomed = (0..lines.len()).find(|&i| {
            if protected[i] || !bare_key.is_match(lines[i]) {
                return false;
            }
            let indent = indent_of(lines[i]);
            match lines[i + 1..].iter().find(|l| !l.trim().is_empty()) {
                None => true,
                Some(next) => {
                    let next_indent = indent_of(next);
                    next_indent < indent
                        || (next_indent == indent && !next.trim_start().starts_with("- "))
                }
            }
        });
        match doomed {
            Some(i) => {
                lines.remove(i);
            }
            None => break,
        }
    }

    let mut pruned = lines.join("\n");
    pruned.push('\n');
    pruned
}

/// Replace the sentinel volume with a raw volumes block
pub fn splice_volumes(text: &str, block: &str) -> Result<String> {
    let sentinel = format!("- name: {VOLUMES_ANCHOR}");
    let Some(position) = text.lines().position(|line| line.trim() == sentinel) else {
        return Err(ConvertError::MissingAnchor {
            anchor: VOLUMES_ANCHOR.to_string(),
        });
    };

    let mut out = String::with_capacity(text.len() + block.len());
    for (i, line) in text.lines().enumerate() {
        if i == position {
            let indent = " ".repeat(indent_of(line));
            for block_line in block.lines() {
                if !block_line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(block_line);
                }
                out.push('\n');
            }
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Replace the value at a `/`-separated mapping path (`spec/replicas`)
///
/// Returns `None` when the path does not exist in the document.
pub fn splice_scalar(text: &str, path: &str, replacement: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let protected = block_scalar_content(&lines);

    let mut start = 0;
    let mut parent_indent: Option<usize> = None;
    let mut found = None;

    for segment in path.split('/') {
        let prefix = format!("{segment}:");
        let mut child_indent = None;
        let mut hit = None;

        for (i, line) in lines.iter().enumerate().skip(start) {
            if protected[i] || line.trim().is_empty() {
                continue;
            }
            let indent = indent_of(line);
            if parent_indent.is_some_and(|p| indent <= p) {
                break;
            }
            let level = *child_indent.get_or_insert(indent);
            if indent != level {
                continue;
            }
            let rest = &line[indent..];
            if rest == prefix || rest.starts_with(&format!("{prefix} ")) {
                hit = Some(i);
                break;
            }
        }

        let i = hit?;
        start = i + 1;
        parent_indent = Some(indent_of(lines[i]));
        found = Some(i);
    }

    let target = found?;
    let indent = indent_of(lines[target]);
    let key = path.rsplit('/').next()?;

    let mut out = String::with_capacity(text.len());
    for (i, line) in lines.iter().enumerate() {
        if i == target {
            out.push_str(&format!("{}{}: {}", " ".repeat(indent), key, replacement));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    Some(out)
}

/// Externalize an integer-typed field by splicing its reference in
///
/// The default is recorded only when the path exists, so no reference is
/// emitted without a value and no value is recorded without a reference.
pub fn splice_value(
    text: &mut String,
    path: &str,
    scope: &mut ValueScope,
    field: &str,
    default: impl Into<serde_json::Value>,
) -> bool {
    match splice_scalar(text, path, &scope.reference(field)) {
        Some(spliced) => {
            *text = spliced;
            scope.record(field, default);
            true
        }
        None => {
            tracing::debug!("no '{}' in {} template, not externalized", path, scope.path());
            false
        }
    }
}

/// Append a raw block of top-level keys at the end of the document
pub fn append_block(text: &mut String, block: &str) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(block);
}

/// Wrap a whole document in `{{- if <condition> }}`
pub fn wrap_conditional(text: &str, condition: &str) -> String {
    format!("{{{{- if {condition} }}}}\n{text}{{{{- end }}}}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_removes_zero_values() {
        let text = "\
apiVersion: v1
kind: Pod
metadata:
  name: web
spec:
  containers:
  - name: nginx
    resources: {}
    ports: []
  securityContext: {}
status: null
";
        let pruned = prune_empty_fields(text);
        assert!(!pruned.contains("resources"));
        assert!(!pruned.contains("ports"));
        assert!(!pruned.contains("securityContext"));
        assert!(!pruned.contains("status"));
        assert!(pruned.contains("  - name: nginx"));
    }

    #[test]
    fn test_prune_keeps_empty_dir_and_lists() {
        let text = "\
spec:
  volumes:
  - name: cache
    emptyDir: {}
";
        assert_eq!(prune_empty_fields(text), text);
    }

    #[test]
    fn test_prune_removes_emptied_parents() {
        let text = "\
metadata:
  name: web
  annotations:
    note: {}
spec:
  template:
    metadata:
      labels: {}
  replicas: 1
";
        let pruned = prune_empty_fields(text);
        assert_eq!(
            pruned,
            "\
metadata:
  name: web
spec:
  replicas: 1
"
        );
    }

    #[test]
    fn test_prune_leaves_block_scalars_alone() {
        let text = "\
metadata:
  annotations:
    script: |
      empty: {}
      nested:
  name: web
";
        assert_eq!(prune_empty_fields(text), text);
    }

    #[test]
    fn test_splice_scalar_follows_indentation() {
        let text = "\
metadata:
  name: web
spec:
  template:
    spec:
      replicas: 9
  replicas: 3
";
        let spliced = splice_scalar(text, "spec/replicas", "{{ .Values.web.replicas }}").unwrap();
        assert!(spliced.contains("  replicas: {{ .Values.web.replicas }}\n"));
        assert!(spliced.contains("      replicas: 9\n"));
    }

    #[test]
    fn test_splice_scalar_missing_path() {
        let text = "spec:\n  selector:\n    app: web\n";
        assert!(splice_scalar(text, "spec/replicas", "x").is_none());
        assert!(splice_scalar(text, "status/replicas", "x").is_none());
    }

    #[test]
    fn test_splice_value_records_only_on_success() {
        let mut scope = ValueScope::new("web");
        let mut text = "spec:\n  replicas: 3\n".to_string();

        assert!(splice_value(&mut text, "spec/replicas", &mut scope, "replicas", 3));
        assert!(!splice_value(&mut text, "spec/paused", &mut scope, "paused", true));
        assert_eq!(text, "spec:\n  replicas: {{ .Values.web.replicas }}\n");
        assert!(scope.get("replicas").is_some());
        assert!(scope.get("paused").is_none());
    }

    #[test]
    fn test_splice_volumes_reindents_block() {
        let text = format!(
            "spec:\n  template:\n    spec:\n      volumes:\n      - name: {VOLUMES_ANCHOR}\n"
        );
        let block = "- name: cache\n  emptyDir: {}\n";
        let spliced = splice_volumes(&text, block).unwrap();
        assert!(spliced.ends_with("      volumes:\n      - name: cache\n        emptyDir: {}\n"));
    }

    #[test]
    fn test_splice_volumes_requires_anchor() {
        let err = splice_volumes("spec: {}\n", "- name: x\n").unwrap_err();
        assert!(matches!(err, ConvertError::MissingAnchor { .. }));
    }

    #[test]
    fn test_wrap_conditional() {
        let wrapped = wrap_conditional("kind: PersistentVolumeClaim\n", ".Values.persistence.data.enabled");
        assert_eq!(
            wrapped,
            "{{- if .Values.persistence.data.enabled }}\nkind: PersistentVolumeClaim\n{{- end }}\n"
        );
    }
}
