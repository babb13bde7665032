//! Campus Companion Models - the Local Store.
//!
//! This crate owns all data persistence: SQLite initialization and pooling,
//! the table definitions, the versioned migration engine, and the entity
//! models for mirrored events, lost & found postings, class schedule rows,
//! and preferences.

pub mod db;
pub mod schema;
pub mod migrations;
pub mod models;
pub mod time;

// Re-export key types
pub use db::{Database, DatabaseStats, DbPool};
pub use migrations::MigrationOutcome;
pub use models::event::{Event, EventSource, NewEvent};
pub use models::lost_found::{LostFoundFilter, LostFoundItem, LostFoundKind, LostFoundStatus};
pub use models::preferences::{Preferences, ThemePreference};
pub use models::schedule::ScheduleEntry;
