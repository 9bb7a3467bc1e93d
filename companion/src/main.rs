//! Aozora Companion - Host-Side Reader for the HUD
//!
//! Searches the Aozora Bunko archive, tracks reading progress and shows
//! works page by page on the heads-up display. Without a device the HUD is
//! simulated: screens are printed to stdout and stdin lines act as taps.
//!
//! # Usage
//!
//! ```bash
//! # Search the archive
//! aozora-companion search 夏目
//!
//! # Works in progress, most recent first
//! aozora-companion reading
//!
//! # Read a work, resuming where you left off
//! aozora-companion read 789
//!
//! # Start at a specific page, host-only
//! aozora-companion --no-hud read 789 --page 3
//!
//! # Type a query, one edit per line
//! aozora-companion live-search
//!
//! # Simulate a device that never answers, falling back to host-only
//! aozora-companion --withhold-bridge read 789
//!
//! # Verbose logging
//! RUST_LOG=debug aozora-companion demo
//! ```

mod commands;
mod hud;
mod simulator;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hud_core::config::{default_config_path, load_config, ConfigOverrides};
use tracing::{error, info};

use commands::App;
use hud::BridgeAvailability;

/// Aozora Companion - read Aozora Bunko works on a HUD
#[derive(Parser, Debug)]
#[command(name = "aozora-companion")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "AOZORA_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory for reading progress
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Archive API base URL
    #[arg(long, value_name = "URL", global = true)]
    api_base: Option<String>,

    /// Skip the HUD and run host-only
    #[arg(long, global = true)]
    no_hud: bool,

    /// Simulated bridge latency in milliseconds
    #[arg(long, env = "AOZORA_BRIDGE_DELAY_MS", value_name = "MS", global = true)]
    bridge_delay_ms: Option<u64>,

    /// Simulate a device that never offers a bridge
    #[arg(long, global = true)]
    withhold_bridge: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "AOZORA_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the archive by title or author
    Search {
        /// Free-text query
        query: String,
    },

    /// List works in progress, most recently read first
    Reading,

    /// Forget the reading progress of a work
    Forget {
        /// Work id
        id: String,
    },

    /// Read a work on the HUD
    Read {
        /// Work id
        id: String,

        /// Zero-based page to start at (defaults to the saved position)
        #[arg(long, allow_hyphen_values = true)]
        page: Option<i64>,
    },

    /// Browse the demo pages on the HUD
    Demo,

    /// Debounced search driven by stdin, one query edit per line
    LiveSearch,
}

/// Initialize logging to stderr, keeping stdout for HUD output
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("aozora_companion={level},hud_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().or_else(default_config_path);
    let overrides = ConfigOverrides {
        api_base_url: args.api_base.clone(),
        data_dir: args.data_dir.clone(),
    };
    let config =
        load_config(config_path.as_deref(), &overrides).context("Failed to load configuration")?;
    info!(
        source = %config.source(),
        base_url = %config.api_base_url,
        "Configuration loaded"
    );

    let bridge = BridgeAvailability::from_flags(args.bridge_delay_ms, args.withhold_bridge);
    let app = App::new(config, !args.no_hud)?.with_bridge(bridge);

    let result = match args.command {
        Command::Search { query } => commands::search(&app, &query).await,
        Command::Reading => commands::reading(&app).await,
        Command::Forget { id } => commands::forget(&app, &id).await,
        Command::Read { id, page } => commands::read(&app, &id, page).await,
        Command::Demo => commands::demo(&app).await,
        Command::LiveSearch => commands::live_search(&app).await,
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}
