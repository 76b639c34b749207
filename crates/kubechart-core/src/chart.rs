//! Chart.yaml metadata and on-disk chart layout

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name of the chart metadata file
pub const CHART_FILE: &str = "Chart.yaml";
/// Name of the default values document
pub const VALUES_FILE: &str = "values.yaml";
/// Directory holding the generated templates
pub const TEMPLATES_DIR: &str = "templates";
/// Name of the shared helper template
pub const HELPERS_FILE: &str = "_helpers.tpl";

/// Default chart version when none is given
pub const DEFAULT_CHART_VERSION: &str = "0.1.0";

/// Boilerplate helper templates, identical for every generated chart
pub const DEFAULT_HELPERS: &str = r#"{{/* vim: set filetype=mustache: */}}
{{/*
Expand the name of the chart.
*/}}
{{- define "name" -}}
{{- default .Chart.Name .Values.nameOverride | trunc 63 | trimSuffix "-" -}}
{{- end -}}

{{/*
Create a default fully qualified app name.
Kubernetes name fields are limited to 63 characters.
*/}}
{{- define "fullname" -}}
{{- $name := default .Chart.Name .Values.nameOverride -}}
{{- printf "%s-%s" .Release.Name $name | trunc 63 | trimSuffix "-" -}}
{{- end -}}
"#;

/// Helm Chart.yaml structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart API version
    pub api_version: String,

    /// Chart name
    pub name: String,

    /// Chart description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Chart version (SemVer)
    pub version: String,
}

impl ChartMetadata {
    /// Metadata for a freshly generated chart
    pub fn generated(name: &str) -> Self {
        Self {
            api_version: "v1".to_string(),
            name: name.to_string(),
            description: Some(format!(
                "Helm chart for {name}, generated from cluster manifests by kubechart"
            )),
            version: DEFAULT_CHART_VERSION.to_string(),
        }
    }

    /// Override the chart version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Override the chart description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse from YAML
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Paths of every artifact inside a generated chart directory
#[derive(Debug, Clone)]
pub struct ChartLayout {
    root: PathBuf,
}

impl ChartLayout {
    /// Layout for the chart `name` created under `location`
    pub fn new(location: &Path, name: &str) -> Self {
        Self {
            root: location.join(name),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chart_file(&self) -> PathBuf {
        self.root.join(CHART_FILE)
    }

    pub fn values_file(&self) -> PathBuf {
        self.root.join(VALUES_FILE)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn helpers_file(&self) -> PathBuf {
        self.templates_dir().join(HELPERS_FILE)
    }

    /// Template path following the `<key>.<suffix>.yaml` convention
    pub fn template_file(&self, key: &str, suffix: &str) -> PathBuf {
        self.templates_dir().join(format!("{key}.{suffix}.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_metadata_roundtrip() {
        let meta = ChartMetadata::generated("shop").with_version("1.2.3");
        let yaml = meta.to_yaml().unwrap();

        assert!(yaml.contains("apiVersion: v1"));
        assert!(yaml.contains("name: shop"));
        assert!(yaml.contains("version: 1.2.3"));

        let parsed = ChartMetadata::parse(&yaml).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_layout_paths() {
        let layout = ChartLayout::new(Path::new("/tmp/out"), "shop");

        assert_eq!(layout.chart_file(), Path::new("/tmp/out/shop/Chart.yaml"));
        assert_eq!(layout.values_file(), Path::new("/tmp/out/shop/values.yaml"));
        assert_eq!(
            layout.helpers_file(),
            Path::new("/tmp/out/shop/templates/_helpers.tpl")
        );
        assert_eq!(
            layout.template_file("web", "svc"),
            Path::new("/tmp/out/shop/templates/web.svc.yaml")
        );
    }
}
