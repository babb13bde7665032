//! Status command - show API reachability and local store status.

use console::style;

use cc_api::EventScope;
use cc_core::config::ConfigHandle;
use cc_core::error::CcResult;
use cc_models::Preferences;
use cc_services::Service;

use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> CcResult<()> {
    let (base_url, events_limit, lost_found_limit) = {
        let cfg = config.read().await;
        (
            cfg.server.base_url.clone(),
            cfg.sync.events_limit,
            cfg.sync.lost_found_limit,
        )
    };

    let services = super::build_services(&config).await?;
    let start = std::time::Instant::now();
    let ping = services.api.get_events(&EventScope::Upcoming { limit: 1 }).await;
    let latency_ms = start.elapsed().as_millis();
    let ping_error = ping.err().map(|e| e.to_string());
    let reachable = ping_error.is_none();

    let stats = services.db.stats()?;
    let theme = Preferences::theme(&*services.db.conn()?)?;
    let service_status = vec![services.sync.status(), services.connectivity.status()];

    match format {
        OutputFormat::Json => {
            super::print_json(&serde_json::json!({
                "api_url": base_url,
                "api_reachable": reachable,
                "latency_ms": latency_ms,
                "api_error": ping_error,
                "sync_limits": {
                    "events": events_limit,
                    "lost_found": lost_found_limit,
                },
                "local_store": stats,
                "theme": theme.as_str(),
                "services": service_status,
            }))?;
        }
        OutputFormat::Text => {
            println!("{}", style("Remote").bold().underlined());
            println!("  API:       {}", base_url);
            println!(
                "  Status:    {}",
                if reachable {
                    format!("{} ({}ms)", style("reachable").green(), latency_ms)
                } else {
                    style("unreachable").red().to_string()
                }
            );
            if let Some(error) = &ping_error {
                println!("  Error:     {}", style(error).dim());
            }
            println!("  Limits:    {} events, {} postings per sync", events_limit, lost_found_limit);

            println!();
            println!("{}", style("Local Store").bold().underlined());
            println!("  Events:    {} synced, {} manual", stats.events_api, stats.events_manual);
            println!("  Postings:  {}", stats.lost_found);
            println!("  Classes:   {}", stats.schedule);
            println!("  Schema:    v{}", stats.schema_version);
            println!("  Theme:     {}", theme);

            println!();
            println!("{}", style("Services").bold().underlined());
            for status in &service_status {
                println!("  {:<13}{}", status.name, status.state);
            }
        }
    }

    Ok(())
}
