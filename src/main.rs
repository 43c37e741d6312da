//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the Listing-Harvester crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, validate, Config};
use listing_harvester::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a resumable listings-site crawler
///
/// Listing-Harvester walks a paginated listings site, scrapes every item's
/// detail page with bounded concurrency and writes the results as JSON and
/// CSV. Progress is checkpointed, so an interrupted run resumes where it
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A resumable listings-site crawler", long_about = None)]
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

    /// Start a fresh run, discarding any saved progress
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the maximum number of listing pages to visit
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
        validate(&config).context("invalid --max-pages")?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Listing-Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing path: {}", config.site.listing_path);
    println!("  Phone path: {}", config.site.phone_path);

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!(
        "  Stop after empty pages: {}",
        config.crawler.empty_page_threshold
    );
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Page delay: {}ms", config.crawler.page_delay);
    println!("  Task delay: {}ms", config.crawler.task_delay);
    println!("  Flush every: {} listings", config.crawler.flush_interval);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Accept-Language: {}", config.http.accept_language);

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Intermediate: {}", config.output.intermediate_path);
    println!(
        "  Final: {}, {}",
        config.output.json_path, config.output.csv_path
    );
    println!(
        "  Partial: {}, {}",
        config.output.partial_json_path, config.output.partial_csv_path
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh run (ignoring saved progress)");
    } else {
        tracing::info!("Starting run (will resume if saved progress exists)");
    }

    match crawl(config, fresh).await {
        Ok(summary) if summary.phase.is_cut_short() => {
            tracing::warn!("Run interrupted with {} records saved", summary.records);
            Ok(())
        }
        Ok(summary) => {
            tracing::info!("Harvest completed: {} records", summary.records);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
