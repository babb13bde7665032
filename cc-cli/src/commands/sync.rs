//! Sync commands.

use clap::Subcommand;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use cc_core::config::ConfigHandle;
use cc_core::error::{CcError, CcResult};
use cc_services::{Collection, SyncReport};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum SyncAction {
    /// Mirror remote events.
    Events,
    /// Mirror remote lost & found postings.
    #[command(name = "lost-found")]
    LostFound,
    /// Mirror both collections.
    All,
}

pub async fn run(config: ConfigHandle, action: SyncAction, format: OutputFormat) -> CcResult<()> {
    let services = super::build_services(&config).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let results: Vec<(Collection, CcResult<SyncReport>)> = match action {
        SyncAction::Events => {
            pb.set_message("Syncing events...");
            vec![(Collection::Events, services.sync.sync(Collection::Events).await)]
        }
        SyncAction::LostFound => {
            pb.set_message("Syncing lost & found...");
            vec![(
                Collection::LostFound,
                services.sync.sync(Collection::LostFound).await,
            )]
        }
        SyncAction::All => {
            pb.set_message("Syncing events and lost & found...");
            services.sync.sync_all().await
        }
    };
    pb.finish_and_clear();

    let stats = services.db.stats()?;

    match format {
        OutputFormat::Json => {
            let runs: Vec<serde_json::Value> = results
                .iter()
                .map(|(collection, result)| match result {
                    Ok(report) => serde_json::json!({
                        "collection": collection,
                        "status": "complete",
                        "report": report,
                    }),
                    Err(e) => serde_json::json!({
                        "collection": collection,
                        "status": "failed",
                        "remote": e.is_remote(),
                        "error": e.to_string(),
                    }),
                })
                .collect();
            super::print_json(&serde_json::json!({ "runs": runs, "store": stats }))?;
        }
        OutputFormat::Text => {
            let mut table = super::new_table(vec!["Collection", "Status", "Removed", "Inserted", "Attempts", "Time"]);
            for (collection, result) in &results {
                match result {
                    Ok(report) => {
                        table.add_row(vec![
                            collection.to_string(),
                            style("ok").green().to_string(),
                            report.removed.to_string(),
                            report.inserted.to_string(),
                            report.attempts.to_string(),
                            format!("{}ms", report.duration_ms),
                        ]);
                    }
                    Err(e) => {
                        table.add_row(vec![
                            collection.to_string(),
                            style("failed").red().to_string(),
                            "-".into(),
                            "-".into(),
                            "-".into(),
                            "-".into(),
                        ]);
                        println!(
                            "  {} {}: {}",
                            style("FAIL").red().bold(),
                            collection,
                            e
                        );
                    }
                }
            }
            println!("{table}");
            println!();
            println!("  Local store:");
            println!("    Events (synced):  {}", stats.events_api);
            println!("    Events (manual):  {}", stats.events_manual);
            println!("    Lost & found:     {}", stats.lost_found);
        }
    }

    // Remote failures already reported above; only local ones fail the command.
    results
        .into_iter()
        .filter_map(|(_, result)| result.err())
        .find(|e| !e.is_remote())
        .map_or(Ok(()), Err::<(), CcError>)
}
