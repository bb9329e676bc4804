use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use consensus_engine::ConsensusEngine;
use debate_runner::{report, Overrides, RunnerConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Proposition to debate (read from stdin when omitted)
    input: Option<String>,

    /// Extra context line; repeat for several
    #[arg(long = "context", short = 'c')]
    context: Vec<String>,

    /// Problem complexity between 0.0 and 1.0
    #[arg(long)]
    complexity: Option<f64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Agreement fraction needed for consensus
    #[arg(long)]
    threshold: Option<f64>,

    /// Maximum voting rounds per consensus attempt
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Wall-clock budget in milliseconds (0 = unlimited)
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Print the full result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn read_input(arg: Option<String>) -> Result<String> {
    let input = match arg {
        Some(input) => input,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            buf
        }
    };
    let input = input.trim().to_string();
    if input.is_empty() {
        bail!("No input to debate: pass it as an argument or on stdin");
    }
    Ok(input)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let overrides = Overrides {
        seed: args.seed,
        threshold: args.threshold,
        max_rounds: args.max_rounds,
        deadline_ms: args.deadline_ms,
        complexity: args.complexity,
    };
    let config = RunnerConfig::load(args.config.as_deref(), &overrides)?;
    let input = read_input(args.input)?;

    let mut context = config.run.context.clone();
    context.extend(args.context);

    let mut engine = ConsensusEngine::new(config.engine.clone())?;
    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling at the next round boundary");
            cancel.cancel();
        }
    });

    info!(
        config = ?args.config,
        complexity = config.run.complexity,
        context_lines = context.len(),
        "Debate runner starting"
    );
    let result = engine
        .run_consensus_debate(&input, &context, config.run.complexity)
        .await?;

    if args.json {
        println!("{}", report::render_json(&result)?);
    } else {
        print!("{}", report::render_text(&result));
    }
    Ok(())
}
