//! Database management commands.

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;

use cc_core::config::ConfigHandle;
use cc_core::error::CcResult;
use cc_models::migrations::{self, LATEST_VERSION, MIGRATIONS};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum DbAction {
    /// Show database statistics.
    Stats,
    /// Run an integrity check.
    Check,
    /// Apply pending schema migrations and show the schema version.
    Migrate,
    /// Delete all events, postings, classes, and preferences.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Drop and recreate every table (WARNING: destroys all data).
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the database file path.
    Path,
}

fn confirm(prompt: &str, yes: bool) -> bool {
    yes || Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

pub async fn run(config: ConfigHandle, action: DbAction, format: OutputFormat) -> CcResult<()> {
    let db_path = config.read().await.effective_db_path()?;

    match action {
        DbAction::Stats => {
            let db = super::init_database(&config).await?;
            let stats = db.stats()?;

            let file_size = std::fs::metadata(&db_path).ok().map(|m| m.len());
            let wal_path = db_path.with_extension("db-wal");
            let wal_size = std::fs::metadata(&wal_path).ok().map(|m| m.len());

            let conn = db.conn()?;
            let journal_mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_else(|_| "unknown".to_string());

            match format {
                OutputFormat::Json => {
                    super::print_json(&serde_json::json!({
                        "path": db_path.display().to_string(),
                        "tables": stats,
                        "file_size_bytes": file_size,
                        "wal_size_bytes": wal_size,
                        "journal_mode": journal_mode,
                    }))?;
                }
                OutputFormat::Text => {
                    println!("{}", style("Database Statistics").bold().underlined());
                    println!("  Path:            {}", db_path.display());
                    println!("  Journal mode:    {}", journal_mode);
                    println!("  Schema version:  {}/{}", stats.schema_version, LATEST_VERSION);
                    println!();

                    let mut table = super::new_table(vec!["Table", "Row Count"]);
                    table.add_row(vec!["events (synced)".to_string(), stats.events_api.to_string()]);
                    table.add_row(vec!["events (manual)".to_string(), stats.events_manual.to_string()]);
                    table.add_row(vec!["lost_found".to_string(), stats.lost_found.to_string()]);
                    table.add_row(vec!["schedule".to_string(), stats.schedule.to_string()]);
                    table.add_row(vec!["preferences".to_string(), stats.preferences.to_string()]);
                    println!("{table}");

                    if let Some(size) = file_size {
                        println!();
                        println!("  Database file:   {}", format_bytes(size));
                        if let Some(wal) = wal_size {
                            println!("  WAL file:        {}", format_bytes(wal));
                        }
                    }
                }
            }
        }
        DbAction::Check => {
            println!("  {} Running integrity check...", style("...").dim());
            let db = super::init_database(&config).await?;

            match db.run_integrity_check() {
                Ok(()) => {
                    println!("  {} Integrity check passed.", style("OK").green().bold());
                }
                Err(e) => {
                    println!("  {} {}", style("FAIL").red().bold(), e);
                    return Err(e);
                }
            }
        }
        DbAction::Migrate => {
            // Opening the store applies any pending migrations.
            let db = super::init_database(&config).await?;
            let version = migrations::current_version(&*db.conn()?)?;

            match format {
                OutputFormat::Json => {
                    let applied: Vec<_> = MIGRATIONS
                        .iter()
                        .map(|m| serde_json::json!({
                            "id": m.id,
                            "name": m.name,
                            "applied": m.id <= version,
                        }))
                        .collect();
                    super::print_json(&serde_json::json!({
                        "schema_version": version,
                        "latest": LATEST_VERSION,
                        "migrations": applied,
                    }))?;
                }
                OutputFormat::Text => {
                    let mut table = super::new_table(vec!["Version", "Migration", "Status"]);
                    for m in MIGRATIONS {
                        let status = if m.id <= version {
                            style("applied").green().to_string()
                        } else {
                            style("pending").yellow().to_string()
                        };
                        table.add_row(vec![m.id.to_string(), m.name.to_string(), status]);
                    }
                    println!("{table}");
                    println!("  Schema version: {}", version);
                }
            }
        }
        DbAction::Clear { yes } => {
            if !confirm("  Delete all locally stored data?", yes) {
                println!("  Clear cancelled.");
                return Ok(());
            }
            let db = super::init_database(&config).await?;
            db.clear_user_data()?;
            println!("  {} Local data cleared.", style("OK").green().bold());
        }
        DbAction::Reset { yes } => {
            println!(
                "  {} This will drop and recreate every table.",
                style("WARNING").red().bold()
            );
            println!("  Database: {}", db_path.display());
            if !confirm("  Are you sure you want to reset the database?", yes) {
                println!("  Reset cancelled.");
                return Ok(());
            }
            let db = super::init_database(&config).await?;
            db.reset()?;
            println!("  {} Database reset complete.", style("OK").green().bold());
        }
        DbAction::Path => match format {
            OutputFormat::Json => {
                super::print_json(&serde_json::json!({ "path": db_path.display().to_string() }))?;
            }
            OutputFormat::Text => println!("{}", db_path.display()),
        },
    }

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
