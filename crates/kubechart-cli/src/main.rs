//! Kubechart CLI - turn running Kubernetes manifests into a Helm chart

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "kubechart")]
#[command(author = "Kubechart Contributors")]
#[command(version)]
#[command(about = "Turn running Kubernetes manifests into a Helm chart", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a chart from manifest files
    Create {
        /// Chart name
        name: String,

        /// Manifest file(s) or directories (non-recursive)
        #[arg(short = 'f', long = "from", required = true, num_args = 1..)]
        from: Vec<PathBuf>,

        /// Directory the chart directory is created in
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Version written to a new Chart.yaml
        #[arg(long)]
        chart_version: Option<String>,

        /// Description written to a new Chart.yaml
        #[arg(long)]
        description: Option<String>,

        /// Show what would be generated without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Convert the remaining objects when one fails
        #[arg(long)]
        keep_going: bool,
    },

    /// List the supported resource kinds
    Kinds,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Create {
            name,
            from,
            output,
            chart_version,
            description,
            dry_run,
            keep_going,
        } => commands::create::run(commands::create::CreateArgs {
            name,
            from,
            output,
            chart_version,
            description,
            dry_run,
            keep_going,
        }),

        Commands::Kinds => commands::kinds::run(),
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
