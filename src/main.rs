//! Harvestman main entry point
//!
//! Command-line interface for the Harvestman web harvester.

use anyhow::Context;
use clap::Parser;
use harvestman::config::load_config_with_hash;
use harvestman::output::{load_output, print_statistics, RunStatistics};
use harvestman::url::normalize_url;
use harvestman::Coordinator;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// Harvestman: a site-bounded web harvester
///
/// Harvestman crawls a single site from a seed address, respecting
/// robots.txt, and writes one structured JSON record per fetched page.
#[derive(Parser, Debug)]
#[command(name = "harvestman")]
#[command(version)]
#[command(about = "A site-bounded web harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed address to start crawling from
    #[arg(value_name = "SEED", required_unless_present = "stats")]
    seed: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore the persisted visited cache and start fresh
    #[arg(long)]
    fresh: bool,

    /// Show statistics from an existing output artifact and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) =
        load_config_with_hash(&cli.config).context("failed to load configuration")?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)?;
    } else {
        let seed = cli.seed.expect("clap enforces SEED outside --stats");
        handle_crawl(config, &seed, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("harvestman=info,warn"),
            1 => EnvFilter::new("harvestman=debug,info"),
            2 => EnvFilter::new("harvestman=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: reads the output artifact and prints statistics
fn handle_stats(config: &harvestman::Config) -> anyhow::Result<()> {
    let path = Path::new(&config.persistence.output_path);
    println!("Output artifact: {}\n", path.display());

    let output = load_output(path).context("failed to read output artifact")?;

    println!("Crawl started: {}", output.crawl_info.start_time);
    println!("Failed targets: {}\n", output.crawl_info.failed_targets);

    let stats = RunStatistics::from_records(&output.pages);
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: harvestman::Config, seed: &str, fresh: bool) -> anyhow::Result<()> {
    let seed = normalize_url(seed).context("invalid seed address")?;
    let output_path = config.persistence.output_path.clone();

    let coordinator = Coordinator::new(config.clone(), seed);

    // Render progress events as human-readable status lines
    let mut progress = coordinator.subscribe_progress();
    let printer = tokio::spawn(async move {
        loop {
            match progress.recv().await {
                Ok(event) => tracing::info!("{}", event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("progress stream lagged, {} events dropped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Ctrl-C requests a cooperative stop; workers finish their in-flight
    // fetches and state is persisted before exit.
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping crawl");
            cancel.cancel();
        }
    });

    let outcome = coordinator.run(fresh).await?;

    if let Err(e) =
        harvestman::output::write_output(Path::new(&output_path), &config, &outcome)
    {
        tracing::error!("failed to write output artifact {}: {}", output_path, e);
    }

    printer.abort();

    let stats = RunStatistics::from_records(&outcome.records);
    print_statistics(&stats);

    Ok(())
}
