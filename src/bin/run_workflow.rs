//! Run one workflow from a JSON request file and print the result.
//!
//! Usage:
//!   cargo run --bin run_workflow -- inspection --input request.json
//!   cargo run --bin run_workflow -- diagnosis --input request.json --no-notify

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inspect_pipeline::{
    build_completion_client, build_notifier,
    config::Config,
    notify::{DisabledNotifier, Notifier},
    schemas::{DiagnosisInput, InspectionInput},
    workflows::{DiagnosisWorkflow, InspectionWorkflow},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "run_workflow")]
#[command(about = "Run an inspection or diagnosis workflow from a JSON file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to the request JSON
    #[arg(short, long)]
    input: PathBuf,
    /// Skip the completion webhook
    #[arg(long)]
    no_notify: bool,
    /// Print compact instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspection analysis: detect, estimate, report
    Inspection(RunArgs),
    /// Maintenance diagnosis: diagnose, estimate, report
    Diagnosis(RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    inspect_pipeline::load_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inspect_pipeline=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let client = build_completion_client(&config)?;

    match cli.command {
        Commands::Inspection(args) => {
            let input: InspectionInput = read_input(&args)?;
            let notifier = notifier_for(&config, &args)?;
            let workflow = InspectionWorkflow::new(&config, client, notifier)?;
            let result = workflow.run(input).await?;
            print_json(&result, args.compact)?;
        }
        Commands::Diagnosis(args) => {
            let input: DiagnosisInput = read_input(&args)?;
            let notifier = notifier_for(&config, &args)?;
            let workflow = DiagnosisWorkflow::new(&config, client, notifier)?;
            let result = workflow.run(input).await?;
            print_json(&result, args.compact)?;
        }
    }

    // Let a dispatched webhook finish before the runtime shuts down.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    Ok(())
}

fn read_input<T: serde::de::DeserializeOwned>(args: &RunArgs) -> Result<T> {
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("read {}", args.input.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", args.input.display()))
}

fn notifier_for(config: &Config, args: &RunArgs) -> Result<Arc<dyn Notifier>> {
    if args.no_notify {
        Ok(Arc::new(DisabledNotifier))
    } else {
        Ok(build_notifier(config)?)
    }
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
}
