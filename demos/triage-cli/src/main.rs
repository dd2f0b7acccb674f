//! Command-line front end for the triage pipeline.
//!
//! ```bash
//! # Evaluate one intake read from stdin
//! echo '{"symptoms":"chest pain","bp":"150/90"}' | triage evaluate
//!
//! # Evaluate a file and print the persistable record
//! triage --config triage.toml evaluate --input intake.json --record
//!
//! # Summarise a JSON-lines file of decisions or records
//! triage stats decisions.jsonl
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use triage::config::TriageConfig;
use triage::primitives::QueueStats;
use triage::telemetry::init_tracing;
use triage::{Decision, DecisionPipeline, IntakeRecord};

/// Triage decision pipeline CLI
#[derive(Parser, Debug)]
#[command(name = "triage", author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML configuration file; `TRIAGE_*` variables override it
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate one intake record and print the decision as JSON
    Evaluate {
        /// Intake JSON file; reads standard input when omitted or `-`
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Print the full record (intake, decision, id, date)
        #[arg(long)]
        record: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Count decisions per risk level and queue from a JSON-lines file
    Stats {
        /// File with one decision or record per line
        path: PathBuf,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = TriageConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging)?;
    debug!(?config, "configuration resolved");

    match cli.command {
        Commands::Evaluate {
            input,
            record,
            pretty,
        } => evaluate(&config, input.as_deref(), record, pretty).await,
        Commands::Stats { path } => stats(&path).await,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn evaluate(
    config: &TriageConfig,
    input: Option<&Path>,
    record: bool,
    pretty: bool,
) -> Result<()> {
    let raw = read_input(input).await?;
    let intake = IntakeRecord::from_json(&raw).context("invalid intake record")?;
    let pipeline = DecisionPipeline::from_config(config)?;

    let evaluation = pipeline.evaluate_detailed(&intake).await;
    info!(id = %evaluation.id(), source = %evaluation.source(), "evaluation complete");

    let output = if record {
        serde_json::to_value(evaluation.into_record(intake))?
    } else {
        serde_json::to_value(evaluation.into_decision())?
    };
    let text = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}

async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read {}", path.display())),
        _ => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("cannot read standard input")?;
            Ok(buffer)
        }
    }
}

async fn stats(path: &Path) -> Result<()> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;

    let mut stats = QueueStats::default();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let decision: Decision = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a decision", index + 1))?;
        stats.record(&decision);
    }
    if stats.total == 0 {
        bail!("{} holds no decisions", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
