//! Create command - build a Helm chart from manifest files
//!
//! Loads every manifest from the given inputs, runs the generator and prints
//! what was written.

use console::style;
use std::path::{Path, PathBuf};

use kubechart_convert::{GenerateOptions, GenerationReport, Generator, ObjectOutcome};
use kubechart_core::load_documents;

use crate::error::{CliError, Result};

pub struct CreateArgs {
    pub name: String,
    pub from: Vec<PathBuf>,
    pub output: PathBuf,
    pub chart_version: Option<String>,
    pub description: Option<String>,
    pub dry_run: bool,
    pub keep_going: bool,
}

pub fn run(args: CreateArgs) -> Result<()> {
    validate_chart_name(&args.name)?;

    let documents = load_documents(&args.from)?;
    if documents.is_empty() {
        return Err(CliError::input_with_help(
            "no manifests found",
            "inputs must be .yaml or .yml files, or directories containing them",
        ));
    }

    print_header(&args, documents.len());

    let options = GenerateOptions {
        chart_name: args.name.clone(),
        output_dir: args.output.clone(),
        chart_version: args.chart_version.clone(),
        description: args.description.clone(),
        dry_run: args.dry_run,
        fail_fast: !args.keep_going,
    };
    let report = Generator::new(options).generate(&documents)?;

    print_objects(&report);
    print_summary(&report);

    let failed = report.failed().count();
    if failed > 0 {
        return Err(CliError::partial(failed));
    }

    print_next_steps(&report);
    Ok(())
}

/// The name becomes a directory, so it must be a single path component
fn validate_chart_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(CliError::usage(format!(
            "invalid chart name '{}': expected a plain directory name",
            name
        )));
    }
    Ok(())
}

fn print_header(args: &CreateArgs, count: usize) {
    println!();
    println!(
        "  {} {} {}",
        style("Kubechart").bold().cyan(),
        style("─").dim(),
        style("manifests → chart").dim()
    );
    println!();
    for input in &args.from {
        println!("  {} {}", style("Source:").dim(), style(input.display()).cyan());
    }
    println!(
        "  {} {} {}",
        style("Target:").dim(),
        style(args.output.join(&args.name).display()).green(),
        style(format!("({} object{})", count, if count == 1 { "" } else { "s" })).dim()
    );
    println!();
}

fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn print_objects(report: &GenerationReport) {
    println!("  {}", style("Templates").bold());
    println!("  {}", style("─────────").dim());

    for outcome in &report.objects {
        match outcome {
            ObjectOutcome::Written { kind, name, path } => println!(
                "  {} {} {}",
                style("✓").green().bold(),
                relative(path, &report.chart_dir).display(),
                style(format!("{kind}/{name}")).dim()
            ),
            ObjectOutcome::Skipped { kind, name } => println!(
                "  {} {} {}",
                style("○").yellow(),
                style(format!("{kind}/{name}")).yellow(),
                style("(kind not supported)").dim()
            ),
            ObjectOutcome::Failed { kind, name, error } => {
                println!(
                    "  {} {}",
                    style("✗").red().bold(),
                    style(format!("{kind}/{name}")).red()
                );
                println!("      {}", style(error).dim());
            }
        }
    }

    if !report.chart_files.is_empty() {
        println!();
        for file in &report.chart_files {
            println!("  {} {}", style("→").blue(), relative(file, &report.chart_dir).display());
        }
    }
    println!();
}

fn print_summary(report: &GenerationReport) {
    println!("  {}", style("Summary").bold());
    println!("  {}", style("───────").dim());
    println!("  {}", report.summary());
    println!();
}

fn print_next_steps(report: &GenerationReport) {
    if report.dry_run {
        println!(
            "  {} {}",
            style("ℹ").cyan(),
            style("Dry run mode - no files were written").dim()
        );
        println!();
        return;
    }

    println!("  {}", style("Next Steps").bold());
    println!("  {}", style("──────────").dim());
    println!(
        "  {} {}",
        style("1.").dim(),
        style(format!("helm lint {}", report.chart_dir.display())).cyan()
    );
    println!("     {}", style("Check the generated chart").dim());
    println!();
    println!(
        "  {} {}",
        style("2.").dim(),
        style(format!("helm template test-release {}", report.chart_dir.display())).cyan()
    );
    println!("     {}", style("Render it with the default values").dim());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_name_must_be_one_component() {
        assert!(validate_chart_name("shop").is_ok());
        assert!(validate_chart_name("my-app_2").is_ok());
        assert!(validate_chart_name("").is_err());
        assert!(validate_chart_name("..").is_err());
        assert!(validate_chart_name("a/b").is_err());
    }
}
