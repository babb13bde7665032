//! Campus Companion CLI - headless front end over the local cache and sync services.
//!
//! Every read command syncs first and then prints from the local store, so
//! the output is the same whether or not the campus API is reachable.

mod commands;

use clap::{Parser, Subcommand};
use tracing::info;

use cc_core::config::{AppConfig, ConfigHandle};
use cc_core::error::CcResult;
use cc_core::logging;

/// Campus Companion - events, lost & found, and class schedule from the terminal.
#[derive(Parser)]
#[command(
    name = "campus",
    version,
    about = "Campus Companion CLI",
    long_about = "A command-line interface for the Campus Companion app.\n\
                   Browses campus events and lost & found postings, online or offline."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Remote API base URL (overrides config).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and manage calendar events.
    Events {
        #[command(subcommand)]
        action: commands::events::EventsAction,
    },
    /// Browse and manage lost & found postings.
    #[command(name = "lost-found")]
    LostFound {
        #[command(subcommand)]
        action: commands::lost_found::LostFoundAction,
    },
    /// Mirror remote collections into the local store.
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// View and modify stored preferences.
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Manage the weekly class schedule.
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Local database management commands.
    Db {
        #[command(subcommand)]
        action: commands::db::DbAction,
    },
    /// Show API reachability and local store status.
    Status,
}

fn load_config(cli: &Cli) -> CcResult<AppConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_file(std::path::Path::new(path))?,
        None => AppConfig::load_default()?,
    };
    if let Some(url) = &cli.api_url {
        config.server.base_url = AppConfig::sanitize_base_url(url);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> CcResult<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize logging
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("logs"));
    let _guard = logging::init_logging(&config.logging, &log_dir, cli.verbose)?;

    info!(
        "Campus Companion CLI v{} (api: {})",
        cc_core::constants::APP_VERSION,
        config.server.base_url
    );

    let config_handle = ConfigHandle::new(config);

    // Dispatch to command handlers
    match cli.command {
        Commands::Events { action } => {
            commands::events::run(config_handle, action, cli.format).await
        }
        Commands::LostFound { action } => {
            commands::lost_found::run(config_handle, action, cli.format).await
        }
        Commands::Sync { action } => {
            commands::sync::run(config_handle, action, cli.format).await
        }
        Commands::Prefs { action } => {
            commands::prefs::run(config_handle, action, cli.format).await
        }
        Commands::Schedule { action } => {
            commands::schedule::run(config_handle, action, cli.format).await
        }
        Commands::Db { action } => {
            commands::db::run(config_handle, action, cli.format).await
        }
        Commands::Status => {
            commands::status::run(config_handle, cli.format).await
        }
    }
}
