//! recordscope miner entry point
//!
//! Mines a batch of git working trees and writes `repositories.csv` and
//! `commits.csv` to the output directory.

use chrono::NaiveDate;
use clap::Parser;
use recordscope_miner::report::ReportWriter;
use recordscope_miner::{DatasetMiner, MiningConfig, MiningError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recordscope-miner")]
#[command(about = "Count record declaration changes across git histories")]
#[command(version)]
struct Args {
    /// Working tree, or directory of working trees (repeatable)
    #[arg(long, num_args = 1..)]
    repos: Vec<PathBuf>,

    /// Stop each commit trace at the first commit on or before this date
    #[arg(long, value_name = "YYYY-MM-DD")]
    since: Option<NaiveDate>,

    /// Directory receiving the CSV reports
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Scratch root; revisions go to its `recordscope-buf` subdirectory
    #[arg(long)]
    scratch: Option<PathBuf>,

    /// Mining cache directory
    #[arg(long, conflicts_with = "no_cache")]
    cache: Option<PathBuf>,

    /// Ignore and do not update the mining cache
    #[arg(long)]
    no_cache: bool,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Checkout attempts before a repository is abandoned
    #[arg(long)]
    max_checkout_attempts: Option<u32>,
}

impl Args {
    fn into_config(self) -> Result<MiningConfig, MiningError> {
        let mut config = match &self.config {
            Some(path) => MiningConfig::load(path)?,
            None => MiningConfig::default(),
        };

        if !self.repos.is_empty() {
            config.repos = self.repos;
        }
        if let Some(since) = self.since {
            config.since = since;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(scratch) = self.scratch {
            config.scratch_dir = scratch;
        }
        if let Some(cache) = self.cache {
            config.cache_dir = Some(cache);
        }
        if self.no_cache {
            config.cache_dir = None;
        }
        if let Some(attempts) = self.max_checkout_attempts {
            config.max_checkout_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(args: Args) -> Result<(), MiningError> {
    let config = args.into_config()?;
    tracing::info!("Mining commits since {}", config.since);
    tracing::info!("Reports: {:?}", config.output_dir);

    let mut report = ReportWriter::create(&config.output_dir)?;
    let miner = DatasetMiner::new(config)?;
    miner.run(&mut report)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recordscope_miner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if args.repos.is_empty() && args.config.is_none() {
        tracing::error!("Nothing to mine: pass --repos or --config");
        return ExitCode::from(2);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Mining failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
