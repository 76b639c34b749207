//! Chart generation: dispatch every object, then flush the values tree

use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

use kubechart_core::chart::DEFAULT_HELPERS;
use kubechart_core::values::PERSISTENCE;
use kubechart_core::{ChartLayout, ChartMetadata, ManifestDocument, Values};

use crate::catalog::ObjectCatalog;
use crate::error::{ConvertError, Result};
use crate::kinds::ConvertContext;
use crate::registry::KindRegistry;
use crate::report::{GenerationReport, ObjectOutcome};

/// Options for a generation run
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Chart name, also the chart directory name
    pub chart_name: String,
    /// Directory the chart directory is created in
    pub output_dir: PathBuf,
    /// Version written to a new Chart.yaml
    pub chart_version: Option<String>,
    /// Description written to a new Chart.yaml
    pub description: Option<String>,
    /// Compute everything, write nothing
    pub dry_run: bool,
    /// Stop at the first object that fails to convert
    pub fail_fast: bool,
}

impl GenerateOptions {
    pub fn new(chart_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            chart_name: chart_name.into(),
            output_dir: output_dir.into(),
            chart_version: None,
            description: None,
            dry_run: false,
            fail_fast: true,
        }
    }
}

/// Turns manifest documents into a chart on disk
pub struct Generator {
    options: GenerateOptions,
    registry: KindRegistry,
}

impl Generator {
    pub fn new(options: GenerateOptions) -> Self {
        Self {
            options,
            registry: KindRegistry::default(),
        }
    }

    /// Generate the chart
    ///
    /// Objects are converted one at a time in input order. Templates already
    /// written stay on disk when a later object aborts the run.
    pub fn generate(&self, documents: &[ManifestDocument]) -> Result<GenerationReport> {
        let layout = ChartLayout::new(&self.options.output_dir, &self.options.chart_name);
        let root = layout.root();
        if root.exists() && !root.is_dir() {
            return Err(ConvertError::OutputNotDirectory(root.to_path_buf()));
        }

        let mut report = GenerationReport::new(root.to_path_buf(), self.options.dry_run);
        if !self.options.dry_run {
            fs::create_dir_all(layout.templates_dir())?;
        }
        self.write_chart_file(&layout, &mut report)?;

        let catalog = ObjectCatalog::build(documents, &self.registry);
        let ctx = ConvertContext::new(&catalog);
        let mut values = Values::new();
        let mut persistence = Values::new();

        for (index, document) in documents.iter().enumerate() {
            let (Some(pipeline), Some(entry)) =
                (self.registry.get(&document.kind), catalog.entry(index))
            else {
                tracing::warn!(
                    "skipping {} '{}' from {}: kind not supported",
                    document.kind,
                    document.name,
                    document.source
                );
                report.objects.push(ObjectOutcome::Skipped {
                    kind: document.kind.clone(),
                    name: document.name.clone(),
                });
                continue;
            };

            tracing::debug!("converting {} '{}' as '{}'", document.kind, document.name, entry.key);
            let converted = match (pipeline.convert)(document, &entry.key, &ctx) {
                Ok(converted) => converted,
                Err(error) if !self.options.fail_fast && error.is_per_object() => {
                    tracing::warn!("{} '{}' not converted: {}", document.kind, document.name, error);
                    report.objects.push(ObjectOutcome::Failed {
                        kind: document.kind.clone(),
                        name: document.name.clone(),
                        error: error.to_string(),
                    });
                    continue;
                }
                Err(error) => return Err(error),
            };

            let path = layout.template_file(&entry.key, pipeline.file_suffix);
            self.write(&path, &converted.template)?;

            values.merge_namespace(&entry.key, converted.values);
            persistence.merge(&Values(JsonValue::Object(converted.persistence)));

            report.objects.push(ObjectOutcome::Written {
                kind: document.kind.clone(),
                name: document.name.clone(),
                path,
            });
        }

        if let JsonValue::Object(claims) = persistence.into_inner() {
            values.merge_namespace(PERSISTENCE, claims);
        }

        let values_file = layout.values_file();
        self.write(&values_file, &values.to_yaml()?)?;
        report.chart_files.push(values_file);

        let helpers_file = layout.helpers_file();
        self.write(&helpers_file, DEFAULT_HELPERS)?;
        report.chart_files.push(helpers_file);

        Ok(report)
    }

    /// Write Chart.yaml unless the chart already has one
    fn write_chart_file(&self, layout: &ChartLayout, report: &mut GenerationReport) -> Result<()> {
        let chart_file = layout.chart_file();
        if chart_file.exists() {
            tracing::info!("keeping existing {}", chart_file.display());
            return Ok(());
        }

        let mut metadata = ChartMetadata::generated(&self.options.chart_name);
        if let Some(version) = &self.options.chart_version {
            metadata = metadata.with_version(version);
        }
        if let Some(description) = &self.options.description {
            metadata = metadata.with_description(description);
        }

        self.write(&chart_file, &metadata.to_yaml()?)?;
        report.chart_files.push(chart_file);
        Ok(())
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        if self.options.dry_run {
            tracing::debug!("dry run, not writing {}", path.display());
            return Ok(());
        }
        fs::write(path, content)?;
        tracing::info!("wrote {}", path.display());
        Ok(())
    }
}
