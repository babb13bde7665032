//! Event commands.

use chrono::{Duration, Utc};
use clap::Subcommand;
use console::style;

use cc_core::config::ConfigHandle;
use cc_core::error::{CcError, CcResult};
use cc_models::{Event, NewEvent};
use cc_services::EventView;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum EventsAction {
    /// Events starting today (UTC).
    Today,
    /// Events from now on.
    Upcoming {
        /// Maximum number of events to show.
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,
    },
    /// Events between two dates (inclusive).
    Range {
        /// First day, YYYY-MM-DD.
        from: String,
        /// Last day, YYYY-MM-DD.
        to: String,
    },
    /// Upcoming events in one category.
    Category {
        /// Category name, e.g. "Academic".
        name: String,
    },
    /// Show a single event.
    Show {
        /// Local event id.
        id: i64,
    },
    /// Add a manual event. Manual events are never touched by sync.
    Add {
        #[arg(short, long)]
        title: String,
        /// Start time (RFC 3339 or "YYYY-MM-DD HH:MM", UTC).
        #[arg(short, long)]
        start: String,
        /// End time, same formats as --start.
        #[arg(short, long)]
        end: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        link: Option<String>,
    },
    /// Remove a manual event.
    Remove {
        /// Local event id.
        id: i64,
    },
}

pub async fn run(config: ConfigHandle, action: EventsAction, format: OutputFormat) -> CcResult<()> {
    let view = match action {
        EventsAction::Today => EventView::today(),
        EventsAction::Upcoming { limit } => EventView::upcoming(limit),
        EventsAction::Range { from, to } => {
            let from = super::parse_date_arg(&from)?;
            let to = super::parse_date_arg(&to)?;
            if to < from {
                return Err(CcError::Validation(format!("range ends before it starts: {from} > {to}")));
            }
            EventView::Range {
                start: cc_models::time::day_bounds(from).0,
                end: cc_models::time::day_bounds(to).1,
            }
        }
        EventsAction::Category { name } => EventView::Category {
            name,
            from: Utc::now(),
        },
        EventsAction::Show { id } => return show(&config, id, format).await,
        EventsAction::Add {
            title,
            start,
            end,
            category,
            location,
            description,
            link,
        } => {
            let new = NewEvent {
                title,
                description,
                category,
                location,
                start_time: Some(super::parse_datetime_arg(&start)?),
                end_time: end.as_deref().map(super::parse_datetime_arg).transpose()?,
                link,
            };
            return add(&config, new, format).await;
        }
        EventsAction::Remove { id } => return remove(&config, id, format).await,
    };

    let services = super::build_services(&config).await?;
    let events = services.connectivity.load_events(&view).await?;
    let online = services.connectivity.is_online();

    match format {
        OutputFormat::Json => {
            super::print_json(&serde_json::json!({
                "online": online,
                "count": events.len(),
                "events": events,
            }))?;
        }
        OutputFormat::Text => {
            if !online {
                super::print_offline_notice();
            }
            print_events(&events);
        }
    }

    Ok(())
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("  No events.");
        return;
    }

    let mut table = super::new_table(vec!["ID", "Starts", "Title", "Category", "Location", "Source"]);
    for event in events {
        table.add_row(vec![
            event.id.map(|id| id.to_string()).unwrap_or_default(),
            super::format_local(&event.start_time),
            super::truncate(&event.title, 40),
            event.category.clone(),
            super::truncate(&event.location, 24),
            event.source.to_string(),
        ]);
    }
    println!("{table}");
    println!("  {} event(s)", events.len());
}

async fn show(config: &ConfigHandle, id: i64, format: OutputFormat) -> CcResult<()> {
    let db = super::init_database(config).await?;
    let event = Event::find(&*db.conn()?, id)?
        .ok_or_else(|| CcError::NotFound(format!("event {id} is not in the local store")))?;

    match format {
        OutputFormat::Json => super::print_json(&event)?,
        OutputFormat::Text => {
            println!("{}", style(&event.title).bold().underlined());
            println!("  ID:          {}", id);
            println!("  Starts:      {}", super::format_local(&event.start_time));
            if let Some(end) = &event.end_time {
                println!("  Ends:        {}", super::format_local(end));
            }
            println!("  Category:    {}", event.category);
            if !event.location.is_empty() {
                println!("  Location:    {}", event.location);
            }
            if let Some(link) = &event.link {
                println!("  Link:        {}", link);
            }
            println!("  Source:      {}", event.source);
            if !event.description.is_empty() {
                println!();
                println!("{}", event.description);
            }
        }
    }
    Ok(())
}

async fn add(config: &ConfigHandle, new: NewEvent, format: OutputFormat) -> CcResult<()> {
    let db = super::init_database(config).await?;
    let event = db.transaction(|conn| Event::insert_manual(conn, &new, Utc::now()))?;

    match format {
        OutputFormat::Json => super::print_json(&event)?,
        OutputFormat::Text => {
            println!(
                "  {} Added \"{}\" on {} (id {}).",
                style("OK").green().bold(),
                event.title,
                super::format_local(&event.start_time),
                event.id.unwrap_or_default()
            );
            if event.start_time < Utc::now() - Duration::hours(1) {
                println!("  {} The event starts in the past.", style("NOTE").yellow().bold());
            }
        }
    }
    Ok(())
}

async fn remove(config: &ConfigHandle, id: i64, format: OutputFormat) -> CcResult<()> {
    let db = super::init_database(config).await?;
    let removed = Event::delete_manual(&*db.conn()?, id)?;

    match format {
        OutputFormat::Json => super::print_json(&serde_json::json!({ "id": id, "removed": removed }))?,
        OutputFormat::Text => {
            if removed {
                println!("  {} Removed event {}.", style("OK").green().bold(), id);
            } else {
                println!(
                    "  {} No manual event with id {} (synced events cannot be removed).",
                    style("WARN").yellow().bold(),
                    id
                );
            }
        }
    }
    Ok(())
}
