//! Sumi-Recrawl main entry point
//!
//! This is the command-line interface for the Sumi-Recrawl recurring crawler.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_recrawl::clock::{Clock, SystemClock};
use sumi_recrawl::config::{load_config_with_hash, Config};
use sumi_recrawl::crawler::{Crawler, QueueManager};
use sumi_recrawl::output::print_statistics;
use sumi_recrawl::spider::{Spider, SpiderRegistry};
use sumi_recrawl::storage::{open_storage, Storage};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Recrawl: a recurring web crawler
///
/// Sumi-Recrawl keeps a set of sites fresh: every page is refetched on an
/// adaptive schedule, faster while it keeps changing and slower once it
/// settles. Crawl state lives in a shared store, so crawls survive restarts.
#[derive(Parser, Debug)]
#[command(name = "sumi-recrawl")]
#[command(version)]
#[command(about = "A recurring web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Comma-separated spiders to run (default: all)
    #[arg(long, value_delimiter = ',')]
    spiders: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show queue statistics from the store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let registry =
        SpiderRegistry::from_config(&config.spiders).context("Failed to build spiders")?;
    let spiders = registry
        .select(&cli.spiders)
        .context("Failed to select spiders")?;

    if cli.dry_run {
        handle_dry_run(&config, &spiders);
        return Ok(());
    }

    let storage = open_storage(&config.storage).context("Failed to open storage")?;

    if cli.stats {
        handle_stats(&config, &storage, &spiders)?;
    } else {
        handle_crawl(config, storage, spiders).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_recrawl=info,warn"),
            1 => EnvFilter::new("sumi_recrawl=debug,info"),
            2 => EnvFilter::new("sumi_recrawl=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, spiders: &[Arc<dyn Spider>]) {
    println!("=== Sumi-Recrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Refetching delay: {}s", config.crawler.refetching_delay);
    println!("  Strategy: {:?}", config.crawler.strategy);
    println!("  Realtime queue: {}", config.crawler.realtime);
    println!("  Fetch attempts: {}", config.crawler.fetch_max_attempts);

    println!("\nStorage: {:?} ({})", config.storage.backend, config.storage.database_path);
    println!("Output: {:?}", config.output.kind);

    println!("\nSpiders ({}):", spiders.len());
    for spider in spiders {
        let settings = spider.settings();
        println!(
            "  - {} (depth {}, restart delay {}s, {} start URLs)",
            settings.name,
            settings.depth,
            settings.restart_delay,
            settings.start_urls.len()
        );
        for url in &settings.start_urls {
            println!("    * {}", url);
        }
        if let Some(urllist) = &settings.urllist {
            println!("    bootstrap list: {}", urllist);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows queue statistics
fn handle_stats(config: &Config, storage: &Storage, spiders: &[Arc<dyn Spider>]) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut stats = Vec::with_capacity(spiders.len());

    for spider in spiders {
        let queues =
            QueueManager::from_config(spider.settings(), &config.crawler, storage, clock.clone());
        stats.push(
            queues
                .stats()
                .with_context(|| format!("Failed to read queues of {}", spider.name()))?,
        );
    }

    print_statistics(&stats);
    Ok(())
}

/// Handles the main crawl: one task per spider until Ctrl-C
async fn handle_crawl(config: Config, storage: Storage, spiders: Vec<Arc<dyn Spider>>) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let shutdown = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for spider in spiders {
        let name = spider.name().to_string();
        let mut crawler = Crawler::from_config(
            spider,
            &config,
            &storage,
            clock.clone(),
            shutdown.child_token(),
        )
        .with_context(|| format!("Failed to start spider {}", name))?;

        tasks.spawn(async move {
            let result = crawler.run().await;
            (name, result)
        });
    }

    tracing::info!("Started {} spiders", tasks.len());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current fetch");
            signal.cancel();
        }
    });

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(summary))) => {
                tracing::info!("Spider {} finished: {} URLs processed", name, summary.processed());
            }
            Ok((name, Err(e))) => {
                tracing::error!("Spider {} stopped: {}", name, e);
            }
            Err(e) => {
                tracing::error!("Spider task panicked: {}", e);
            }
        }
    }

    Ok(())
}
