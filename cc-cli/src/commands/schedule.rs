//! Class schedule commands. The schedule is local only.

use clap::Subcommand;
use console::style;

use cc_core::config::ConfigHandle;
use cc_core::error::{CcError, CcResult};
use cc_models::ScheduleEntry;

use crate::OutputFormat;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// List the weekly schedule.
    List {
        /// Only one day: 0-6 or a name such as "mon".
        #[arg(short, long)]
        day: Option<String>,
    },
    /// Add a class meeting.
    Add {
        /// Course code, e.g. "15-112".
        code: String,
        /// Day: 0-6 (0 = Sunday) or a name such as "tue".
        day: String,
        /// Start time, HH:MM.
        start: String,
        /// End time, HH:MM.
        end: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        instructor: Option<String>,
        #[arg(short, long)]
        location: Option<String>,
        /// Display color, e.g. "#10B981".
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Remove a class meeting.
    Remove { id: i64 },
}

/// Parse a day argument as 0-6 or a (prefix of a) day name.
fn parse_day(raw: &str) -> CcResult<u8> {
    let raw = raw.trim().to_ascii_lowercase();
    if let Ok(n) = raw.parse::<u8>() {
        if n <= 6 {
            return Ok(n);
        }
    } else if raw.chars().count() >= 2 {
        let prefix: String = raw.chars().take(3).collect();
        if let Some(idx) = DAY_NAMES
            .iter()
            .position(|d| d.to_ascii_lowercase().starts_with(&prefix))
        {
            return Ok(idx as u8);
        }
    }
    Err(CcError::Validation(format!("invalid day {raw:?}, expected 0-6 or a day name")))
}

fn day_name(day: Option<u8>) -> &'static str {
    day.and_then(|d| DAY_NAMES.get(d as usize).copied()).unwrap_or("-")
}

pub async fn run(config: ConfigHandle, action: ScheduleAction, format: OutputFormat) -> CcResult<()> {
    let db = super::init_database(&config).await?;
    let conn = db.conn()?;

    match action {
        ScheduleAction::List { day } => {
            let entries = match day.as_deref().map(parse_day).transpose()? {
                Some(day) => ScheduleEntry::for_day(&conn, day)?,
                None => ScheduleEntry::all(&conn)?,
            };
            match format {
                OutputFormat::Json => super::print_json(&entries)?,
                OutputFormat::Text => {
                    if entries.is_empty() {
                        println!("  No classes scheduled.");
                    } else {
                        let mut table = super::new_table(vec!["ID", "Day", "Time", "Course", "Name", "Location", "Instructor"]);
                        for entry in &entries {
                            table.add_row(vec![
                                entry.id.map(|id| id.to_string()).unwrap_or_default(),
                                day_name(entry.day_of_week).to_string(),
                                format!("{}-{}", entry.start_time, entry.end_time),
                                entry.course_code.clone(),
                                super::truncate(entry.course_name.as_deref().unwrap_or(""), 32),
                                entry.location.clone().unwrap_or_default(),
                                entry.instructor.clone().unwrap_or_default(),
                            ]);
                        }
                        println!("{table}");
                    }
                }
            }
        }
        ScheduleAction::Add {
            code,
            day,
            start,
            end,
            name,
            instructor,
            location,
            color,
        } => {
            let mut entry = ScheduleEntry::new(&code, parse_day(&day)?, &start, &end);
            entry.course_name = name;
            entry.instructor = instructor;
            entry.location = location;
            if let Some(color) = color {
                entry.color = color;
            }
            let id = entry.insert(&conn)?;

            match format {
                OutputFormat::Json => super::print_json(&entry)?,
                OutputFormat::Text => {
                    println!(
                        "  {} Added {} on {} {}-{} (id {}).",
                        style("OK").green().bold(),
                        entry.course_code,
                        day_name(entry.day_of_week),
                        entry.start_time,
                        entry.end_time,
                        id
                    );
                }
            }
        }
        ScheduleAction::Remove { id } => {
            let removed = ScheduleEntry::delete(&conn, id)?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "id": id, "removed": removed }))?,
                OutputFormat::Text => {
                    if removed {
                        println!("  {} Removed class {}.", style("OK").green().bold(), id);
                    } else {
                        println!("  {} No class with id {}.", style("WARN").yellow().bold(), id);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("0").unwrap(), 0);
        assert_eq!(parse_day("6").unwrap(), 6);
        assert_eq!(parse_day("mon").unwrap(), 1);
        assert_eq!(parse_day("Thursday").unwrap(), 4);
        assert_eq!(parse_day("sa").unwrap(), 6);
        assert!(parse_day("7").is_err());
        assert!(parse_day("x").is_err());
    }

    #[test]
    fn test_day_name() {
        assert_eq!(day_name(Some(2)), "Tue");
        assert_eq!(day_name(None), "-");
        assert_eq!(day_name(Some(9)), "-");
    }
}
