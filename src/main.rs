//! Bookshelf-Crawl main entry point
//!
//! This is the command-line interface for the Bookshelf-Crawl catalog crawler.

use anyhow::{bail, Context};
use bookshelf_crawl::config::{load_config_with_hash, validate, Config};
use bookshelf_crawl::crawler::{crawl, publish_aggregate};
use bookshelf_crawl::output::{
    load_records_from_dir, print_report, read_aggregate, render_charts, SvgChartRenderer,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Bookshelf-Crawl: a catalog crawler for book listing sites
///
/// Bookshelf-Crawl walks every category of a book catalog, extracts each
/// book's detail page, and writes one CSV per category plus a per-category
/// price aggregate and two charts.
#[derive(Parser, Debug)]
#[command(name = "bookshelf-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A catalog crawler for book listing sites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Override the catalog root URL from the config
    #[arg(long, value_name = "URL")]
    root_url: Option<String>,

    /// Base directory for all relative output paths
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["aggregate_only", "charts_only"])]
    dry_run: bool,

    /// Rebuild the aggregate and charts from existing category CSVs and exit
    #[arg(long, conflicts_with_all = ["dry_run", "charts_only"])]
    aggregate_only: bool,

    /// Render the charts from the existing aggregate CSV and exit
    #[arg(long, conflicts_with_all = ["dry_run", "aggregate_only"])]
    charts_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration after command-line overrides")?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
        Ok(ExitCode::SUCCESS)
    } else if cli.aggregate_only {
        handle_aggregate_only(&config)
    } else if cli.charts_only {
        handle_charts_only(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bookshelf_crawl=info,warn"),
            1 => EnvFilter::new("bookshelf_crawl=debug,info"),
            2 => EnvFilter::new("bookshelf_crawl=trace,debug"),
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

/// Applies `--root-url` and `--output-dir`
///
/// With `--output-dir`, every relative output path is re-rooted under it;
/// absolute paths from the config are left alone.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(root_url) = &cli.root_url {
        config.crawler.root_url = root_url.clone();
    }

    if let Some(base) = &cli.output_dir {
        let rebase = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };
        config.output.data_dir = rebase(&config.output.data_dir);
        config.output.aggregate_path = rebase(&config.output.aggregate_path);
        config.output.charts_dir = rebase(&config.output.charts_dir);
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Bookshelf-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Root URL: {}", config.crawler.root_url);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!(
        "  Concurrent categories: {}",
        config.crawler.concurrent_categories
    );
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout_secs, config.crawler.connect_timeout_secs
    );
    println!("  Follow pagination: {}", config.crawler.follow_pagination);
    println!(
        "  Max pages per category: {}",
        config.crawler.max_pages_per_category
    );
    println!("  Download images: {}", config.crawler.download_images);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir.display());
    println!("  Aggregate: {}", config.output.aggregate_path.display());
    if config.output.render_charts {
        println!("  Charts: {}", config.output.charts_dir.display());
    } else {
        println!("  Charts: disabled");
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --aggregate-only mode: re-reads category CSVs
fn handle_aggregate_only(config: &Config) -> anyhow::Result<ExitCode> {
    let data_dir = &config.output.data_dir;
    println!("=== Rebuilding Aggregate ===\n");
    println!("Data directory: {}", data_dir.display());

    let records = load_records_from_dir(data_dir)
        .with_context(|| format!("reading category CSVs under {}", data_dir.display()))?;
    if records.is_empty() {
        bail!("no category CSVs found under {}", data_dir.display());
    }

    let stats = publish_aggregate(&config.output, &records).context("writing aggregate")?;

    println!(
        "✓ Aggregated {} books in {} categories to {}",
        records.len(),
        stats.len(),
        config.output.aggregate_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

/// Handles the --charts-only mode: renders charts from the aggregate CSV
fn handle_charts_only(config: &Config) -> anyhow::Result<ExitCode> {
    let aggregate_path = &config.output.aggregate_path;
    let stats = read_aggregate(aggregate_path)
        .with_context(|| format!("reading aggregate {}", aggregate_path.display()))?;

    let renderer = SvgChartRenderer::new(&config.output.charts_dir);
    for path in render_charts(&renderer, &stats).context("rendering charts")? {
        println!("✓ Wrote {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<ExitCode> {
    tracing::info!(
        "Crawling {} with up to {} concurrent fetches",
        config.crawler.root_url,
        config.crawler.max_concurrent_fetches
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_interrupt.cancel();
        }
    });

    let report = match crawl(config, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report);

    if report.is_clean() {
        tracing::info!("Crawl completed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            "Crawl finished with {} structural failures{}",
            report.structural_failures(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(ExitCode::FAILURE)
    }
}
