//! Versioned schema migrations.
//!
//! The applied version is recorded in the `preferences` table under a
//! reserved key. Each migration is identified by the version it produces and
//! runs inside its own transaction together with the version record, so it
//! is either fully applied or not applied at all.
//!
//! Stores from releases that predate the version record report version 0 and
//! replay every migration. That is safe because each migration tolerates
//! finding its change already in place.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use cc_core::constants::pref_keys;
use cc_core::error::{CcError, CcResult};

use crate::schema;

/// Version produced by the newest migration.
pub const LATEST_VERSION: i64 = 3;

/// A single schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Schema version this migration produces.
    pub id: i64,
    /// Short human-readable name.
    pub name: &'static str,
    kind: MigrationKind,
}

#[derive(Debug, Clone, Copy)]
enum MigrationKind {
    /// `ALTER TABLE .. ADD COLUMN`.
    AddColumn {
        table: &'static str,
        column: &'static str,
        decl: &'static str,
    },
    /// Shadow-table rebuild of `events` into its current shape.
    RebuildEvents,
}

/// All migrations in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        name: "add events.source",
        kind: MigrationKind::AddColumn {
            table: "events",
            column: "source",
            decl: "TEXT NOT NULL DEFAULT 'manual'",
        },
    },
    Migration {
        id: 2,
        name: "add events.link",
        kind: MigrationKind::AddColumn {
            table: "events",
            column: "link",
            decl: "TEXT",
        },
    },
    Migration {
        id: 3,
        name: "drop events.category check constraint",
        kind: MigrationKind::RebuildEvents,
    },
];

/// What happened when a migration was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The change was made and the version recorded.
    Applied,
    /// The change was already present (recorded version, or the change itself
    /// was found in place).
    AlreadyApplied,
}

/// Apply every migration newer than the recorded version.
///
/// Returns the outcome of each migration that was attempted. Any failure other
/// than "already applied" is returned as [`CcError::MigrationFailed`].
pub fn run_migrations(conn: &Connection) -> CcResult<Vec<(i64, MigrationOutcome)>> {
    let current = current_version(conn)?;

    if current >= LATEST_VERSION {
        info!("database schema is up to date (version {current})");
        return Ok(Vec::new());
    }

    info!("running migrations from version {current} to {LATEST_VERSION}");

    let mut outcomes = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.id > current) {
        let outcome = apply_migration(conn, migration.id)?;
        outcomes.push((migration.id, outcome));
    }

    info!("migrations complete, schema at version {LATEST_VERSION}");
    Ok(outcomes)
}

/// Apply one migration exactly once.
///
/// A migration at or below the recorded version is skipped. Otherwise the
/// change and the new version record commit together.
pub fn apply_migration(conn: &Connection, id: i64) -> CcResult<MigrationOutcome> {
    let migration = MIGRATIONS
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| CcError::MigrationFailed {
            id,
            reason: "unknown migration".into(),
        })?;

    let current = current_version(conn)?;
    if current >= id {
        debug!("migration {id} ({}) already recorded", migration.name);
        return Ok(MigrationOutcome::AlreadyApplied);
    }

    let failed = |reason: String| CcError::MigrationFailed { id, reason };

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| failed(e.to_string()))?;

    let outcome = match run_step(&tx, migration) {
        Ok(()) => MigrationOutcome::Applied,
        Err(CcError::MigrationAlreadyApplied(_)) => MigrationOutcome::AlreadyApplied,
        Err(CcError::MigrationFailed { reason, .. }) => return Err(failed(reason)),
        Err(other) => return Err(failed(other.to_string())),
    };

    set_version(&tx, id).map_err(|e| failed(e.to_string()))?;
    tx.commit().map_err(|e| failed(e.to_string()))?;

    match outcome {
        MigrationOutcome::Applied => info!("applied migration {id}: {}", migration.name),
        MigrationOutcome::AlreadyApplied => {
            info!("migration {id} ({}) found in place, recorded", migration.name)
        }
    }
    Ok(outcome)
}

/// Read the recorded schema version. Missing record means version 0.
pub fn current_version(conn: &Connection) -> CcResult<i64> {
    match conn.query_row(
        "SELECT value FROM preferences WHERE key = ?1",
        [pref_keys::SCHEMA_VERSION],
        |row| row.get::<_, String>(0),
    ) {
        Ok(raw) => raw.trim().parse::<i64>().map_err(|e| {
            CcError::Database(format!("corrupt schema version record {raw:?}: {e}"))
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(CcError::Database(e.to_string())),
    }
}

/// Record the schema version.
fn set_version(conn: &Connection, version: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO preferences (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![pref_keys::SCHEMA_VERSION, version.to_string()],
    )?;
    Ok(())
}

fn run_step(conn: &Connection, migration: &Migration) -> CcResult<()> {
    match migration.kind {
        MigrationKind::AddColumn { table, column, decl } => {
            add_column(conn, migration.id, table, column, decl)
        }
        MigrationKind::RebuildEvents => rebuild_events(conn, migration.id),
    }
}

/// Add a column; a duplicate-column error means the change is already present.
fn add_column(conn: &Connection, id: i64, table: &str, column: &str, decl: &str) -> CcResult<()> {
    let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {decl}");
    match conn.execute(&sql, []) {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_column(&err) => Err(CcError::MigrationAlreadyApplied(id)),
        Err(err) => Err(CcError::MigrationFailed {
            id,
            reason: err.to_string(),
        }),
    }
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            message.contains("duplicate column name")
        }
        _ => false,
    }
}

/// Columns carried across an `events` rebuild.
const EVENT_COLUMNS: &str =
    "id, title, description, category, location, start_time, end_time, source, link, created_at";

/// Rebuild `events` through a shadow table, keeping every row and id.
///
/// Runs unconditionally: rebuilding a table that is already in the current
/// shape copies it onto an identical table, so a replay changes nothing.
fn rebuild_events(conn: &Connection, id: i64) -> CcResult<()> {
    let failed = |e: rusqlite::Error| CcError::MigrationFailed {
        id,
        reason: e.to_string(),
    };

    let before: i64 = conn
        .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .map_err(failed)?;

    conn.execute_batch("DROP TABLE IF EXISTS events_new;")
        .map_err(failed)?;
    conn.execute_batch(&schema::events_table_sql("events_new"))
        .map_err(failed)?;
    conn.execute(
        &format!(
            "INSERT INTO events_new ({EVENT_COLUMNS})
             SELECT id, title, description, category, location, start_time, end_time,
                    COALESCE(source, 'manual'), link, created_at
             FROM events"
        ),
        [],
    )
    .map_err(failed)?;

    let copied: i64 = conn
        .query_row("SELECT COUNT(*) FROM events_new", [], |row| row.get(0))
        .map_err(failed)?;
    if copied != before {
        warn!("events rebuild copied {copied} of {before} rows, aborting");
        return Err(CcError::MigrationFailed {
            id,
            reason: format!("copied {copied} of {before} rows"),
        });
    }

    conn.execute_batch(
        "DROP TABLE events;
         ALTER TABLE events_new RENAME TO events;",
    )
    .map_err(failed)?;

    debug!("rebuilt events table ({copied} rows)");
    Ok(())
}
