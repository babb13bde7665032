//! Database initialization, connection pooling, and lifecycle management.
//!
//! Uses SQLite in WAL mode with r2d2 connection pooling.
//! Runs integrity checks on startup and brings the schema up to date.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{error, info, warn};

use cc_core::config::DatabaseConfig;
use cc_core::error::{CcError, CcResult};

use crate::models::event::{Event, EventSource};
use crate::models::preferences::Preferences;
use crate::schema;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Cloneable handle to the Local Store.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Open (or create) the store at `db_path`.
    ///
    /// This:
    /// 1. Creates parent directories if needed
    /// 2. Sets up connection pooling with the configured PRAGMAs
    /// 3. Runs an integrity check if configured
    /// 4. Creates missing tables, applies pending migrations, creates indexes
    pub fn init(db_path: &Path, config: &DatabaseConfig) -> CcResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("initializing database at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let db = Self::with_manager(manager, config)?;

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        db.migrate()?;

        info!("database initialized successfully");
        Ok(db)
    }

    /// An in-memory store with a single shared connection.
    pub fn open_in_memory() -> CcResult<Self> {
        let config = DatabaseConfig {
            wal_mode: false,
            pool_size: 1,
            ..DatabaseConfig::default()
        };
        // The single connection must never be recycled or the data goes with it.
        let builder = Pool::builder().idle_timeout(None).max_lifetime(None);
        let db = Self::with_builder(builder, SqliteConnectionManager::memory(), &config)?;
        db.migrate()?;
        Ok(db)
    }

    fn with_manager(manager: SqliteConnectionManager, config: &DatabaseConfig) -> CcResult<Self> {
        Self::with_builder(Pool::builder(), manager, config)
    }

    fn with_builder(
        builder: r2d2::Builder<SqliteConnectionManager>,
        manager: SqliteConnectionManager,
        config: &DatabaseConfig,
    ) -> CcResult<Self> {
        let pool = builder
            .max_size(config.pool_size.max(1))
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(manager)
            .map_err(|e| CcError::Pool(e.to_string()))?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Create missing tables, run pending migrations, then create indexes.
    pub fn migrate(&self) -> CcResult<()> {
        let conn = self.conn()?;
        schema::ensure_schema(&conn)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> CcResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| CcError::Pool(e.to_string()))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> CcResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(|e| CcError::Database(e.to_string()))?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(CcError::IntegrityCheck(result));
        }

        info!("database integrity check passed");
        Ok(())
    }

    /// Execute a function within a database transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`. Any error rolls the
    /// store back to its state before the call.
    pub fn transaction<T, F>(&self, f: F) -> CcResult<T>
    where
        F: FnOnce(&Connection) -> CcResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| CcError::LocalWriteFailed(e.to_string()))?;

        let result = f(&tx)?;

        tx.commit()
            .map_err(|e| CcError::LocalWriteFailed(e.to_string()))?;

        Ok(result)
    }

    /// Get database statistics (row counts per table).
    pub fn stats(&self) -> CcResult<DatabaseStats> {
        let conn = self.conn()?;

        let count = |table: &str| -> CcResult<i64> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            conn.query_row(&sql, [], |row| row.get(0))
                .map_err(|e| CcError::Database(e.to_string()))
        };

        Ok(DatabaseStats {
            events_api: Event::count_by_source(&conn, EventSource::Api)?,
            events_manual: Event::count_by_source(&conn, EventSource::Manual)?,
            lost_found: count("lost_found")?,
            schedule: count("schedule")?,
            preferences: Preferences::all(&conn)?.len() as i64,
            schema_version: crate::migrations::current_version(&conn)?,
        })
    }

    /// Wipe events, lost & found, schedule, and user preferences. The schema
    /// version record is kept so the next start does not replay migrations.
    pub fn clear_user_data(&self) -> CcResult<()> {
        warn!("clearing all locally stored data");
        self.transaction(|conn| {
            conn.execute_batch(
                "DELETE FROM events;
                 DELETE FROM lost_found;
                 DELETE FROM schedule;",
            )
            .map_err(|e| CcError::LocalWriteFailed(e.to_string()))?;
            Preferences::clear(conn)?;
            Ok(())
        })
    }

    /// Reset the database by dropping and recreating all tables.
    pub fn reset(&self) -> CcResult<()> {
        warn!("resetting database - all data will be lost");
        let conn = self.conn()?;
        schema::drop_tables(&conn)?;
        schema::ensure_schema(&conn)?;
        info!("database reset complete");
        Ok(())
    }
}

/// Database row count statistics.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub events_api: i64,
    pub events_manual: i64,
    pub lost_found: i64,
    pub schedule: i64,
    pub preferences: i64,
    pub schema_version: i64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "events(api)={}, events(manual)={}, lost_found={}, schedule={}, preferences={}, schema_version={}",
            self.events_api, self.events_manual, self.lost_found, self.schedule,
            self.preferences, self.schema_version
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA cache_size=-16000;
             PRAGMA busy_timeout=5000;",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use crate::models::event::NewEvent;
    use crate::models::schedule::ScheduleEntry;

    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let config = DatabaseConfig::default();
        let db = Database::init(&path, &config).unwrap();
        (db, dir)
    }

    fn add_manual_event(conn: &Connection, title: &str) {
        let new = NewEvent {
            title: title.into(),
            start_time: Some(Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()),
            ..Default::default()
        };
        Event::insert_manual(conn, &new, Utc::now()).unwrap();
    }

    #[test]
    fn test_database_init() {
        let (db, _dir) = test_db();
        let stats = db.stats().unwrap();
        assert_eq!(stats.events_api, 0);
        assert_eq!(stats.schema_version, crate::migrations::LATEST_VERSION);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reopen.db");
        {
            let db = Database::init(&path, &DatabaseConfig::default()).unwrap();
            add_manual_event(&db.conn().unwrap(), "Orientation");
        }
        let db = Database::init(&path, &DatabaseConfig::default()).unwrap();
        assert_eq!(db.stats().unwrap().events_manual, 1);
    }

    #[test]
    fn test_integrity_check() {
        let (db, _dir) = test_db();
        assert!(db.run_integrity_check().is_ok());
    }

    #[test]
    fn test_transaction_commits() {
        let (db, _dir) = test_db();
        let result = db.transaction(|conn| {
            add_manual_event(conn, "Committed");
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(db.stats().unwrap().events_manual, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (db, _dir) = test_db();
        let result: CcResult<()> = db.transaction(|conn| {
            add_manual_event(conn, "Discarded");
            Err(CcError::LocalWriteFailed("disk full".into()))
        });
        assert!(matches!(result, Err(CcError::LocalWriteFailed(_))));
        assert_eq!(db.stats().unwrap().events_manual, 0);
    }

    #[test]
    fn test_clear_user_data_keeps_version() {
        let (db, _dir) = test_db();
        {
            let conn = db.conn().unwrap();
            add_manual_event(&conn, "Orientation");
            ScheduleEntry::new("15-213", 1, "09:00", "10:20").insert(&conn).unwrap();
            Preferences::set(&conn, "theme_preference", "dark").unwrap();
        }
        db.clear_user_data().unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.events_manual, 0);
        assert_eq!(stats.schedule, 0);
        assert_eq!(stats.preferences, 0);
        assert_eq!(stats.schema_version, crate::migrations::LATEST_VERSION);
    }

    #[test]
    fn test_in_memory_store() {
        let db = Database::open_in_memory().unwrap();
        add_manual_event(&db.conn().unwrap(), "Scratch");
        assert_eq!(db.stats().unwrap().events_manual, 1);
    }
}
