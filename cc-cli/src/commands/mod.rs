//! CLI command implementations.

pub mod events;
pub mod lost_found;
pub mod sync;
pub mod prefs;
pub mod schedule;
pub mod db;
pub mod status;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use serde::Serialize;

use cc_api::ApiClient;
use cc_core::config::ConfigHandle;
use cc_core::error::{CcError, CcResult};
use cc_models::{time, Database};
use cc_services::{ConnectivityService, EventBus, Service, SyncService};

/// Helper to initialize the database from config.
pub async fn init_database(config: &ConfigHandle) -> CcResult<Database> {
    let cfg = config.read().await;
    let db_path = cfg.effective_db_path()?;
    Database::init(&db_path, &cfg.database)
}

/// Helper to create an API client from config.
pub async fn create_api_client(config: &ConfigHandle) -> CcResult<ApiClient> {
    let server_config = config.read().await.server.clone();
    ApiClient::new(&server_config)
}

/// The store, client, and services a command works against.
pub struct Services {
    pub db: Database,
    pub api: Arc<ApiClient>,
    pub sync: Arc<SyncService>,
    pub connectivity: ConnectivityService,
}

/// Wire the sync engine and connectivity controller over one store and client.
pub async fn build_services(config: &ConfigHandle) -> CcResult<Services> {
    let db = init_database(config).await?;
    let api = Arc::new(create_api_client(config).await?);
    let event_bus = EventBus::new(128);

    let mut sync = SyncService::new(config.clone(), db.clone(), api.clone(), event_bus.clone());
    sync.init()?;
    let sync = Arc::new(sync);

    let mut connectivity = ConnectivityService::new(db.clone(), sync.clone(), event_bus);
    connectivity.init()?;
    Ok(Services {
        db,
        api,
        sync,
        connectivity,
    })
}

/// A table with the house style.
pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> CcResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Tell the user they are looking at cached data.
pub fn print_offline_notice() {
    println!(
        "  {} Campus API unreachable, showing cached data.\n",
        style("OFFLINE").yellow().bold()
    );
}

/// Parse a timestamp argument: RFC 3339, `YYYY-MM-DD HH:MM[:SS]` (UTC), or a
/// bare date meaning midnight UTC.
pub fn parse_datetime_arg(raw: &str) -> CcResult<DateTime<Utc>> {
    time::parse_timestamp(raw)
        .ok_or_else(|| CcError::Validation(format!("invalid timestamp {raw:?}")))
}

/// Parse a `YYYY-MM-DD` argument.
pub fn parse_date_arg(raw: &str) -> CcResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CcError::Validation(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

/// Format a timestamp for table output, in local time.
pub fn format_local(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&chrono::Local)
        .format("%a %b %d %H:%M")
        .to_string()
}

/// Truncate a string to a maximum length, appending an ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
