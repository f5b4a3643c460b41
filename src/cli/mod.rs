//! Command-line entry point.

mod progress;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use console::style;

use evharvest::config::Config;
use evharvest::harvest::{read_sources, Harvester};
use evharvest::report::Reporter;
use evharvest::render::ChromeRenderer;
use evharvest::storage::EventStore;

use progress::TerminalReporter;

#[derive(Parser)]
#[command(name = "evharvest")]
#[command(about = "Harvest upcoming events into a markdown event store")]
#[command(version)]
pub struct Cli {
    /// File with one source URL per line
    #[arg(env = "EVHARVEST_SOURCES", default_value = "sources.txt")]
    sources: PathBuf,

    /// Store directory holding new/, updated/ and archive/ (overrides config file)
    #[arg(short, long, env = "EVHARVEST_STORE")]
    store: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, env = "EVHARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Chrome/Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// Connect to a running browser's DevTools endpoint instead of launching one
    #[arg(long, env = "BROWSER_URL")]
    remote_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Exit as soon as the run is done instead of waiting for Esc
    #[arg(long, env = "EVHARVEST_NO_WAIT")]
    no_wait: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Checked before the store or the browser is touched.
    let sources = read_sources(&cli.sources)?;

    let config = Config::load(cli.config.as_deref())
        .await
        .map_err(anyhow::Error::msg)?;
    let cwd = std::env::current_dir()?;

    let store_root = cli
        .store
        .clone()
        .unwrap_or_else(|| config.store_root(&cwd));

    let mut browser = config.resolved_browser(&cwd);
    if let Some(chrome) = cli.chrome {
        browser.chrome_path = Some(chrome);
    }
    if let Some(remote_url) = cli.remote_url {
        browser.remote_url = Some(remote_url);
    }
    if cli.headed {
        browser.headless = false;
    }

    let store = EventStore::open(&store_root)?;
    tracing::info!(
        "Harvesting {} sources into {}",
        sources.len(),
        store_root.display()
    );

    let mut harvester = Harvester::new(ChromeRenderer::new(browser), store)
        .with_extraction(config.extraction)
        .with_naming(config.naming);

    let mut reporter = TerminalReporter::new();
    let summary = harvester.run(&sources, &mut reporter).await?;
    reporter.finish();

    println!(
        "{} new, {} updated, {} duplicate",
        style(summary.counters.new).green(),
        style(summary.counters.updated).yellow(),
        style(summary.counters.duplicated).red(),
    );
    let failures = summary.failed_sources + summary.failed_events + summary.write_failures;
    if failures > 0 || summary.skipped > 0 {
        println!(
            "{} failed sources, {} failed events, {} skipped, {} write failures",
            summary.failed_sources, summary.failed_events, summary.skipped, summary.write_failures
        );
    }

    if !cli.no_wait && tui::should_wait() {
        tokio::task::spawn_blocking(tui::wait_for_exit).await??;
    }

    Ok(())
}
