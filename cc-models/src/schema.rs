//! Table definitions, index creation, and schema inspection.
//!
//! Tables are created in their current shape. Stores written by older
//! releases keep their existing tables (`CREATE TABLE IF NOT EXISTS` leaves
//! them alone) and are brought forward by [`crate::migrations`].

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use cc_core::error::{CcError, CcResult};

use crate::migrations;

/// Tables owned by the store, in creation order.
pub const TABLES: &[&str] = &["events", "schedule", "lost_found", "preferences"];

/// Bring a store of any prior version to the current schema.
///
/// Safe to call on every process start: creates missing tables, applies
/// migrations newer than the recorded version, then (re)creates indexes.
pub fn ensure_schema(conn: &Connection) -> CcResult<()> {
    create_tables(conn)?;
    migrations::run_migrations(conn)?;
    create_indexes(conn)?;
    Ok(())
}

/// Create all tables if they do not exist.
pub fn create_tables(conn: &Connection) -> CcResult<()> {
    conn.execute_batch(&events_table_sql("events"))
        .and_then(|_| conn.execute_batch(TABLES_SQL))
        .map_err(|e| CcError::Database(format!("failed to create schema: {e}")))?;
    info!("database schema verified");
    Ok(())
}

/// Create indexes. Runs after migrations because some indexed columns are
/// added by them and a table rebuild drops the old table's indexes.
pub fn create_indexes(conn: &Connection) -> CcResult<()> {
    conn.execute_batch(INDEXES_SQL)
        .map_err(|e| CcError::Database(format!("failed to create indexes: {e}")))
}

/// Drop all tables (used for a full store reset).
pub fn drop_tables(conn: &Connection) -> CcResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS events;
         DROP TABLE IF EXISTS events_new;
         DROP TABLE IF EXISTS schedule;
         DROP TABLE IF EXISTS lost_found;
         DROP TABLE IF EXISTS preferences;",
    )
    .map_err(|e| CcError::Database(format!("failed to drop tables: {e}")))?;
    Ok(())
}

/// The schema shape actually present in a store.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaState {
    /// Recorded schema version (0 when nothing has been recorded).
    pub version: i64,
    /// Column names per table.
    pub columns: BTreeMap<String, Vec<String>>,
    /// Whether `events.category` still carries the first-release CHECK constraint.
    pub category_constrained: bool,
}

impl SchemaState {
    /// Whether `table` has a column named `column`.
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(table)
            .map_or(false, |cols| cols.iter().any(|c| c == column))
    }
}

/// Read the recorded version and the live column layout.
pub fn inspect(conn: &Connection) -> CcResult<SchemaState> {
    let mut columns = BTreeMap::new();
    for table in TABLES {
        columns.insert(table.to_string(), table_columns(conn, table)?);
    }

    let events_sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'events'",
            [],
            |row| row.get(0),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })
        .map_err(|e| CcError::Database(e.to_string()))?;

    Ok(SchemaState {
        version: migrations::current_version(conn)?,
        columns,
        category_constrained: events_sql
            .map_or(false, |sql| sql.to_uppercase().contains("CHECK")),
    })
}

/// Column names of `table` in declaration order. Empty if the table is missing.
pub fn table_columns(conn: &Connection, table: &str) -> CcResult<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| CcError::Database(e.to_string()))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))
        .map_err(|e| CcError::Database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| CcError::Database(e.to_string()))?;
    Ok(names)
}

/// Current shape of the `events` table under `name`. The migration engine
/// uses the same definition for its shadow table.
pub(crate) fn events_table_sql(name: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {name} (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL,
    description     TEXT,
    category        TEXT,
    location        TEXT,
    start_time      TEXT NOT NULL,
    end_time        TEXT,
    source          TEXT NOT NULL DEFAULT 'manual',
    link            TEXT,
    created_at      TEXT DEFAULT CURRENT_TIMESTAMP
);
"#
    )
}

const TABLES_SQL: &str = r#"
-- Class schedule, entered locally and never synced
CREATE TABLE IF NOT EXISTS schedule (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    course_code     TEXT NOT NULL,
    course_name     TEXT,
    instructor      TEXT,
    location        TEXT,
    day_of_week     INTEGER,
    start_time      TEXT NOT NULL,
    end_time        TEXT NOT NULL,
    color           TEXT DEFAULT '#3B82F6'
);

-- Lost & found postings, mirrored wholesale from the API
CREATE TABLE IF NOT EXISTS lost_found (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    type            TEXT NOT NULL,
    item_name       TEXT NOT NULL,
    description     TEXT,
    category        TEXT,
    location_lost   TEXT,
    image_path      TEXT,
    contact_info    TEXT,
    status          TEXT DEFAULT 'active',
    created_at      TEXT DEFAULT CURRENT_TIMESTAMP,
    expires_at      TEXT
);

CREATE TABLE IF NOT EXISTS preferences (
    key             TEXT PRIMARY KEY,
    value           TEXT NOT NULL
);
"#;

const INDEXES_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_events_start_time ON events(start_time);
CREATE INDEX IF NOT EXISTS idx_events_source ON events(source);
CREATE INDEX IF NOT EXISTS idx_events_category ON events(category);
CREATE INDEX IF NOT EXISTS idx_lost_found_status ON lost_found(status);
CREATE INDEX IF NOT EXISTS idx_lost_found_created_at ON lost_found(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_schedule_day ON schedule(day_of_week);
"#;
