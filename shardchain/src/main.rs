// src/main.rs
//
// Command-line front end for the fork-choice library:
//
// - `resolve` loads a JSON snapshot and prints the tip of every shard
// - `demo` prints a small two-shard snapshot to feed into `resolve`

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shardchain::{ChainConfig, ForkChoiceSnapshot, MetricsRegistry};

/// Sharded GHOST fork choice over JSON snapshots.
#[derive(Parser, Debug)]
#[command(name = "shardchain", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Resolve the tip of every shard in a snapshot.
    Resolve {
        /// Snapshot file (JSON).
        #[arg(long)]
        snapshot: PathBuf,
        /// Chain configuration file (JSON). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Resolve sibling shards concurrently.
        #[arg(long)]
        parallel: bool,
        /// Dump Prometheus metrics to stderr after resolving.
        #[arg(long)]
        metrics: bool,
    },
    /// Print a demo snapshot as JSON.
    Demo,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shardchain=info")),
        )
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Resolve {
            snapshot,
            config,
            parallel,
            metrics,
        } => resolve(snapshot, config, parallel, metrics),
        Commands::Demo => {
            let json = serde_json::to_string_pretty(&ForkChoiceSnapshot::demo())
                .map_err(|e| format!("failed to encode demo snapshot: {e}"))?;
            println!("{json}");
            Ok(())
        }
    }
}

fn resolve(
    snapshot_path: PathBuf,
    config_path: Option<PathBuf>,
    parallel: bool,
    dump_metrics: bool,
) -> Result<(), String> {
    let mut cfg = match config_path {
        Some(path) => ChainConfig::from_json_file(&path).map_err(|e| e.to_string())?,
        None => ChainConfig::default(),
    };
    cfg.fork_choice.parallel |= parallel;

    let snapshot = ForkChoiceSnapshot::from_json_file(&snapshot_path).map_err(|e| e.to_string())?;
    tracing::info!(
        blocks = snapshot.blocks.len(),
        votes = snapshot.votes.len(),
        parallel = cfg.fork_choice.parallel,
        "loaded snapshot from {}",
        snapshot_path.display()
    );

    let metrics = MetricsRegistry::new()
        .map_err(|e| format!("failed to initialise metrics registry: {e}"))?;

    let tips = snapshot
        .resolve_tips(&cfg.fork_choice, Some(&metrics.fork_choice))
        .map_err(|e| format!("fork choice failed: {e}"))?;

    for tip in &tips {
        println!("shard={} tip={} height={}", tip.shard, tip.tip, tip.height);
    }

    if dump_metrics {
        eprint!("{}", metrics.gather_text());
    }
    Ok(())
}
