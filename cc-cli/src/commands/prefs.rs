//! Preference commands.

use clap::Subcommand;
use console::style;

use cc_core::config::ConfigHandle;
use cc_core::error::CcResult;
use cc_models::{Preferences, ThemePreference};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Print one preference.
    Get { key: String },
    /// Store a preference.
    Set { key: String, value: String },
    /// Remove a preference.
    Unset { key: String },
    /// List every preference.
    List,
    /// Show or change the theme (light, dark, system).
    Theme { value: Option<ThemePreference> },
}

pub async fn run(config: ConfigHandle, action: PrefsAction, format: OutputFormat) -> CcResult<()> {
    let db = super::init_database(&config).await?;
    let conn = db.conn()?;

    match action {
        PrefsAction::Get { key } => {
            let value = Preferences::get(&conn, &key)?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "key": key, "value": value }))?,
                OutputFormat::Text => match value {
                    Some(value) => println!("{value}"),
                    None => println!("  {} {} is not set.", style("--").dim(), key),
                },
            }
        }
        PrefsAction::Set { key, value } => {
            Preferences::set(&conn, &key, &value)?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "key": key, "value": value }))?,
                OutputFormat::Text => {
                    println!("  {} {} = {}", style("OK").green().bold(), key, value);
                }
            }
        }
        PrefsAction::Unset { key } => {
            let removed = Preferences::delete(&conn, &key)?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "key": key, "removed": removed }))?,
                OutputFormat::Text => {
                    if removed {
                        println!("  {} Removed {}.", style("OK").green().bold(), key);
                    } else {
                        println!("  {} {} was not set.", style("--").dim(), key);
                    }
                }
            }
        }
        PrefsAction::List => {
            let all = Preferences::all(&conn)?;
            match format {
                OutputFormat::Json => super::print_json(&all)?,
                OutputFormat::Text => {
                    if all.is_empty() {
                        println!("  No preferences stored.");
                    } else {
                        let mut table = super::new_table(vec!["Key", "Value"]);
                        for (key, value) in &all {
                            table.add_row(vec![key.clone(), super::truncate(value, 60)]);
                        }
                        println!("{table}");
                    }
                }
            }
        }
        PrefsAction::Theme { value } => {
            if let Some(theme) = value {
                Preferences::set_theme(&conn, theme)?;
            }
            let theme = Preferences::theme(&conn)?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "theme": theme.as_str() }))?,
                OutputFormat::Text => println!("  Theme: {}", style(theme.as_str()).cyan()),
            }
        }
    }

    Ok(())
}
