//! Lost & found commands.
//!
//! Listing reads the local mirror after a sync. Every write goes to the
//! campus API and is followed by a best-effort re-sync so the mirror
//! reflects it.

use clap::Subcommand;
use console::style;
use tracing::warn;

use cc_api::{LostFoundPatch, NewLostFoundItem};
use cc_core::config::ConfigHandle;
use cc_core::error::CcResult;
use cc_models::{LostFoundFilter, LostFoundItem, LostFoundKind, LostFoundStatus};
use cc_services::Collection;

use crate::OutputFormat;

use super::Services;

#[derive(Subcommand)]
pub enum LostFoundAction {
    /// List active postings.
    List {
        /// Only "lost" or "found" postings.
        #[arg(short, long)]
        kind: Option<LostFoundKind>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<u32>,
    },
    /// Show a single posting.
    Show { id: i64 },
    /// Post a new lost or found item.
    Post {
        /// "lost" or "found".
        kind: LostFoundKind,
        /// What the item is.
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Where it was lost or found.
        #[arg(short, long)]
        location: Option<String>,
        /// How to reach the poster.
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        /// Expiry (RFC 3339 or "YYYY-MM-DD"). Defaults to 30 days from now.
        #[arg(long)]
        expires: Option<String>,
    },
    /// Edit fields of an existing posting.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        status: Option<LostFoundStatus>,
    },
    /// Mark a posting as resolved.
    Resolve { id: i64 },
    /// Delete a posting.
    Delete { id: i64 },
    /// Ask the server to expire overdue postings.
    Cleanup,
}

pub async fn run(config: ConfigHandle, action: LostFoundAction, format: OutputFormat) -> CcResult<()> {
    let services = super::build_services(&config).await?;

    match action {
        LostFoundAction::List { kind, category, limit } => {
            let filter = LostFoundFilter { kind, category, limit };
            let items = services.connectivity.load_lost_found(&filter).await?;
            let online = services.connectivity.is_online();

            match format {
                OutputFormat::Json => {
                    super::print_json(&serde_json::json!({
                        "online": online,
                        "count": items.len(),
                        "items": items,
                    }))?;
                }
                OutputFormat::Text => {
                    if !online {
                        super::print_offline_notice();
                    }
                    print_items(&items);
                }
            }
        }
        LostFoundAction::Show { id } => {
            let local = LostFoundItem::find(&*services.db.conn()?, id)?;
            let item = match local {
                Some(item) => item,
                None => services.api.get_lost_found_item(id).await?,
            };
            match format {
                OutputFormat::Json => super::print_json(&item)?,
                OutputFormat::Text => print_item(&item),
            }
        }
        LostFoundAction::Post {
            kind,
            name,
            description,
            category,
            location,
            contact,
            image_url,
            expires,
        } => {
            let mut item = NewLostFoundItem::new(kind, name);
            item.description = description;
            item.category = category;
            item.location_lost = location;
            item.contact_info = contact;
            item.image_url = image_url;
            item.expires_at = expires.as_deref().map(super::parse_datetime_arg).transpose()?;

            let created = services.api.create_lost_found_item(item).await?;
            resync(&services).await;
            report_written(&created, "Posted", format)?;
        }
        LostFoundAction::Update {
            id,
            name,
            description,
            category,
            location,
            contact,
            image_url,
            status,
        } => {
            if let Some(next) = status {
                if let Some(current) = LostFoundItem::find(&*services.db.conn()?, id)? {
                    current.status.ensure_transition_to(next)?;
                }
            }
            let patch = LostFoundPatch {
                item_name: name,
                description,
                category,
                location_lost: location,
                image_url,
                contact_info: contact,
                status,
            };
            let updated = services.api.update_lost_found_item(id, &patch).await?;
            resync(&services).await;
            report_written(&updated, "Updated", format)?;
        }
        LostFoundAction::Resolve { id } => {
            let resolved = services.api.resolve_lost_found_item(id).await?;
            resync(&services).await;
            report_written(&resolved, "Resolved", format)?;
        }
        LostFoundAction::Delete { id } => {
            services.api.delete_lost_found_item(id).await?;
            resync(&services).await;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "id": id, "deleted": true }))?,
                OutputFormat::Text => {
                    println!("  {} Deleted posting {}.", style("OK").green().bold(), id);
                }
            }
        }
        LostFoundAction::Cleanup => {
            let expired = services.api.cleanup_expired().await?;
            resync(&services).await;
            match format {
                OutputFormat::Json => {
                    super::print_json(&serde_json::json!({
                        "expired": expired.len(),
                        "ids": expired,
                    }))?;
                }
                OutputFormat::Text => {
                    println!(
                        "  {} Server expired {} posting(s).",
                        style("OK").green().bold(),
                        expired.len()
                    );
                    if !expired.is_empty() {
                        let ids: Vec<String> = expired.iter().map(i64::to_string).collect();
                        println!("  ids: {}", ids.join(", "));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Pull the collection again after a remote write. A failure here leaves the
/// mirror one sync behind, which the next listing corrects.
async fn resync(services: &Services) {
    if let Err(e) = services.sync.sync(Collection::LostFound).await {
        warn!("lost & found re-sync after write failed: {e}");
    }
}

fn report_written(item: &LostFoundItem, verb: &str, format: OutputFormat) -> CcResult<()> {
    match format {
        OutputFormat::Json => super::print_json(item)?,
        OutputFormat::Text => {
            println!(
                "  {} {} {} \"{}\" (id {}).",
                style("OK").green().bold(),
                verb,
                item.kind,
                item.item_name,
                item.id
            );
        }
    }
    Ok(())
}

fn print_items(items: &[LostFoundItem]) {
    if items.is_empty() {
        println!("  No active postings.");
        return;
    }

    let mut table = super::new_table(vec!["ID", "Type", "Item", "Category", "Location", "Posted", "Expires"]);
    for item in items {
        let kind = match item.kind {
            LostFoundKind::Lost => style("lost").red().to_string(),
            LostFoundKind::Found => style("found").green().to_string(),
        };
        table.add_row(vec![
            item.id.to_string(),
            kind,
            super::truncate(&item.item_name, 32),
            item.category.clone().unwrap_or_default(),
            super::truncate(item.location_lost.as_deref().unwrap_or(""), 24),
            super::format_local(&item.created_at),
            item.expires_at
                .as_ref()
                .map(super::format_local)
                .unwrap_or_else(|| "-".into()),
        ]);
    }
    println!("{table}");
    println!("  {} posting(s)", items.len());
}

fn print_item(item: &LostFoundItem) {
    println!("{}", style(&item.item_name).bold().underlined());
    println!("  ID:          {}", item.id);
    println!("  Type:        {}", item.kind);
    println!("  Status:      {}", item.status);
    if let Some(category) = &item.category {
        println!("  Category:    {}", category);
    }
    if let Some(location) = &item.location_lost {
        println!("  Location:    {}", location);
    }
    if let Some(contact) = &item.contact_info {
        println!("  Contact:     {}", contact);
    }
    if let Some(image) = &item.image_path {
        println!("  Image:       {}", image);
    }
    println!("  Posted:      {}", super::format_local(&item.created_at));
    if let Some(expires) = &item.expires_at {
        println!("  Expires:     {}", super::format_local(expires));
    }
    if let Some(description) = item.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        println!("{}", description);
    }
}
