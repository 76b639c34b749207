//! Kinds command - list the resource kinds the generator understands

use console::style;

use kubechart_convert::{KeyNamespace, KindRegistry};

use crate::error::Result;

pub fn run() -> Result<()> {
    let registry = KindRegistry::default();

    println!();
    println!("  {}", style("Supported kinds").bold());
    println!("  {}", style("───────────────").dim());
    for pipeline in registry.pipelines() {
        let values = match pipeline.namespace {
            KeyNamespace::Object => "",
            KeyNamespace::Persistence => " (values under persistence)",
        };
        println!(
            "  {:<24} {}{}",
            pipeline.kind,
            style(format!("templates/<key>.{}.yaml", pipeline.file_suffix)).dim(),
            style(values).dim()
        );
    }
    println!();
    println!(
        "  {}",
        style("Objects of any other kind are skipped with a warning").dim()
    );
    println!();

    Ok(())
}
