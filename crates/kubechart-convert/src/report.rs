//! Outcome of a generation run

use std::path::PathBuf;

/// What happened to one input object
#[derive(Debug)]
pub enum ObjectOutcome {
    /// Template written (or, on a dry run, computed) at `path`
    Written {
        kind: String,
        name: String,
        path: PathBuf,
    },
    /// Kind not supported
    Skipped { kind: String, name: String },
    /// Conversion failed and the run kept going
    Failed {
        kind: String,
        name: String,
        error: String,
    },
}

/// Result of a generation run
#[derive(Debug)]
pub struct GenerationReport {
    /// Chart directory
    pub chart_dir: PathBuf,
    /// One outcome per input object, in input order
    pub objects: Vec<ObjectOutcome>,
    /// Files other than templates (Chart.yaml, values.yaml, helpers)
    pub chart_files: Vec<PathBuf>,
    /// Whether anything was written to disk
    pub dry_run: bool,
}

impl GenerationReport {
    pub(crate) fn new(chart_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            chart_dir,
            objects: Vec::new(),
            chart_files: Vec::new(),
            dry_run,
        }
    }

    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.objects.iter().filter_map(|outcome| match outcome {
            ObjectOutcome::Written { path, .. } => Some(path),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.objects.iter().filter_map(|outcome| match outcome {
            ObjectOutcome::Skipped { kind, name } => Some((kind.as_str(), name.as_str())),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.objects.iter().filter_map(|outcome| match outcome {
            ObjectOutcome::Failed { kind, name, error } => {
                Some((kind.as_str(), name.as_str(), error.as_str()))
            }
            _ => None,
        })
    }

    /// No object failed
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let written = self.written().count();
        let skipped = self.skipped().count();
        let failed = self.failed().count();

        let mut summary = format!(
            "{} template{} {}",
            written,
            if written == 1 { "" } else { "s" },
            if self.dry_run { "would be written" } else { "written" }
        );
        if skipped > 0 {
            summary.push_str(&format!(", {skipped} skipped"));
        }
        if failed > 0 {
            summary.push_str(&format!(", {failed} failed"));
        }
        summary
    }
}
