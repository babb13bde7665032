//! Preferences key-value store with typed accessors.
//!
//! Values are TEXT. Keys listed in [`pref_keys::RESERVED`] belong to the
//! store itself: they are hidden from listings and cannot be written here.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use cc_core::constants::pref_keys;
use cc_core::error::{CcError, CcResult};

/// Preferences key-value store backed by the `preferences` table.
pub struct Preferences;

impl Preferences {
    /// Get a raw string value for a key.
    pub fn get(conn: &Connection, key: &str) -> CcResult<Option<String>> {
        match conn.query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CcError::Database(e.to_string())),
        }
    }

    /// Set a raw string value for a key (upsert).
    pub fn set(conn: &Connection, key: &str, value: &str) -> CcResult<()> {
        Self::check_writable(key)?;
        conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| CcError::LocalWriteFailed(e.to_string()))?;
        Ok(())
    }

    /// Delete a preference by key.
    pub fn delete(conn: &Connection, key: &str) -> CcResult<bool> {
        Self::check_writable(key)?;
        let changed = conn
            .execute("DELETE FROM preferences WHERE key = ?1", [key])
            .map_err(|e| CcError::LocalWriteFailed(e.to_string()))?;
        Ok(changed > 0)
    }

    /// All user-visible preferences, sorted by key.
    pub fn all(conn: &Connection) -> CcResult<BTreeMap<String, String>> {
        let mut stmt = conn
            .prepare("SELECT key, value FROM preferences")
            .map_err(|e| CcError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CcError::Database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CcError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|(key, _)| !pref_keys::is_reserved(key))
            .collect())
    }

    /// Remove every user preference. Reserved keys survive.
    pub fn clear(conn: &Connection) -> CcResult<usize> {
        let placeholders = vec!["?"; pref_keys::RESERVED.len()].join(", ");
        conn.execute(
            &format!("DELETE FROM preferences WHERE key NOT IN ({placeholders})"),
            rusqlite::params_from_iter(pref_keys::RESERVED.iter()),
        )
        .map_err(|e| CcError::LocalWriteFailed(e.to_string()))
    }

    /// The stored theme, or the default when unset or unrecognized.
    pub fn theme(conn: &Connection) -> CcResult<ThemePreference> {
        Ok(Self::get(conn, pref_keys::THEME)?
            .and_then(|v| v.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(conn: &Connection, theme: ThemePreference) -> CcResult<()> {
        Self::set(conn, pref_keys::THEME, theme.as_str())
    }

    fn check_writable(key: &str) -> CcResult<()> {
        if key.trim().is_empty() {
            return Err(CcError::Validation("preference key is empty".into()));
        }
        if pref_keys::is_reserved(key) {
            return Err(CcError::Validation(format!("preference key {key:?} is reserved")));
        }
        Ok(())
    }
}

/// Theme selection persisted under [`pref_keys::THEME`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = CcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" | "auto" => Ok(Self::System),
            other => Err(CcError::Validation(format!("unknown theme {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::ensure_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_all_reports_undecodable_rows() {
        let conn = setup_db();
        Preferences::set(&conn, "notifications", "on").unwrap();
        conn.execute("INSERT INTO preferences (key, value) VALUES ('broken', X'00FF')", [])
            .unwrap();
        assert!(matches!(Preferences::all(&conn), Err(CcError::Database(_))));
    }

    #[test]
    fn test_get_set() {
        let conn = setup_db();
        assert_eq!(Preferences::get(&conn, "notifications").unwrap(), None);

        Preferences::set(&conn, "notifications", "on").unwrap();
        assert_eq!(Preferences::get(&conn, "notifications").unwrap(), Some("on".into()));

        Preferences::set(&conn, "notifications", "off").unwrap();
        assert_eq!(Preferences::get(&conn, "notifications").unwrap(), Some("off".into()));
    }

    #[test]
    fn test_delete() {
        let conn = setup_db();
        Preferences::set(&conn, "k", "v").unwrap();
        assert!(Preferences::delete(&conn, "k").unwrap());
        assert!(!Preferences::delete(&conn, "k").unwrap());
    }

    #[test]
    fn test_reserved_keys_hidden_and_protected() {
        let conn = setup_db();
        Preferences::set(&conn, "a", "1").unwrap();

        let all = Preferences::all(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all.contains_key(pref_keys::SCHEMA_VERSION));

        assert!(Preferences::set(&conn, pref_keys::SCHEMA_VERSION, "0").is_err());
        assert!(Preferences::delete(&conn, pref_keys::SCHEMA_VERSION).is_err());
    }

    #[test]
    fn test_clear_keeps_schema_version() {
        let conn = setup_db();
        Preferences::set(&conn, "a", "1").unwrap();
        Preferences::set_theme(&conn, ThemePreference::Dark).unwrap();
        assert_eq!(Preferences::clear(&conn).unwrap(), 2);
        assert!(Preferences::all(&conn).unwrap().is_empty());
        assert!(Preferences::get(&conn, pref_keys::SCHEMA_VERSION).unwrap().is_some());
    }

    #[test]
    fn test_theme() {
        let conn = setup_db();
        assert_eq!(Preferences::theme(&conn).unwrap(), ThemePreference::System);
        Preferences::set_theme(&conn, ThemePreference::Light).unwrap();
        assert_eq!(Preferences::theme(&conn).unwrap(), ThemePreference::Light);

        Preferences::set(&conn, pref_keys::THEME, "sepia").unwrap();
        assert_eq!(Preferences::theme(&conn).unwrap(), ThemePreference::System);
    }
}
