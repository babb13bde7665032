//! Lost & found posting entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use cc_core::constants::LOST_FOUND_DEFAULT_TTL_DAYS;
use cc_core::error::{CcError, CcResult};

use crate::time::{self, format_timestamp, get_optional_timestamp};

/// Whether a posting reports something lost or something found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LostFoundKind {
    Lost,
    Found,
}

impl LostFoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lost => "lost",
            Self::Found => "found",
        }
    }
}

impl fmt::Display for LostFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LostFoundKind {
    type Err = CcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lost" => Ok(Self::Lost),
            "found" => Ok(Self::Found),
            other => Err(CcError::Validation(format!(
                "type must be 'lost' or 'found', got {other:?}"
            ))),
        }
    }
}

/// Lifecycle of a posting. Only `Active` postings are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LostFoundStatus {
    #[default]
    Active,
    Resolved,
    Expired,
}

impl LostFoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
        }
    }

    /// Status only moves forward: `active` to `resolved` or `expired`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Resolved) | (Self::Active, Self::Expired)
        ) || self == next
    }

    /// `can_transition_to` as a validation error.
    pub fn ensure_transition_to(self, next: Self) -> CcResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CcError::Validation(format!(
                "posting is {self}; it cannot move back to {next}"
            )))
        }
    }
}

impl fmt::Display for LostFoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LostFoundStatus {
    type Err = CcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "resolved" => Ok(Self::Resolved),
            "expired" => Ok(Self::Expired),
            other => Err(CcError::Validation(format!("unknown status {other:?}"))),
        }
    }
}

/// A lost & found posting. The id is the remote id; the local table mirrors
/// the remote collection and keeps its identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostFoundItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: LostFoundKind,
    pub item_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location_lost: Option<String>,
    /// Remote `image_url`, stored locally as `image_path`.
    pub image_path: Option<String>,
    pub contact_info: Option<String>,
    pub status: LostFoundStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Listing filter shared by the remote query and the local view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostFoundFilter {
    pub kind: Option<LostFoundKind>,
    pub category: Option<String>,
    pub limit: Option<u32>,
}

impl LostFoundFilter {
    pub fn kind(kind: LostFoundKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Whether an item passes the type and category filters.
    pub fn matches(&self, item: &LostFoundItem) -> bool {
        self.kind.map_or(true, |k| k == item.kind)
            && self
                .category
                .as_deref()
                .map_or(true, |c| item.category.as_deref() == Some(c))
    }
}

const SELECT_ITEMS: &str = "SELECT id, type, item_name, description, category, location_lost, \
     image_path, contact_info, status, created_at, expires_at FROM lost_found";

fn db_err(e: rusqlite::Error) -> CcError {
    CcError::Database(e.to_string())
}

fn write_err(e: rusqlite::Error) -> CcError {
    CcError::LocalWriteFailed(e.to_string())
}

fn column_err(e: CcError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

impl LostFoundItem {
    /// Build an item from a server JSON object.
    pub fn from_server_map(map: &serde_json::Value) -> CcResult<Self> {
        let text = |key: &str| {
            map.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let timestamp = |key: &str| map.get(key).and_then(|v| v.as_str()).and_then(time::parse_timestamp);

        let id = map
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| CcError::Serialization("lost & found item missing id".into()))?;
        let kind = text("type")
            .ok_or_else(|| CcError::Serialization(format!("item {id} missing type")))?
            .parse()?;
        let item_name = text("item_name")
            .ok_or_else(|| CcError::Serialization(format!("item {id} missing item_name")))?;
        let status = match text("status") {
            Some(s) => s.parse()?,
            None => LostFoundStatus::Active,
        };
        let expires_at = timestamp("expires_at");
        let created_at = timestamp("created_at")
            .or_else(|| expires_at.map(|exp| exp - Duration::days(LOST_FOUND_DEFAULT_TTL_DAYS)))
            .unwrap_or_default();

        Ok(Self {
            id,
            kind,
            item_name,
            description: text("description"),
            category: text("category"),
            location_lost: text("location_lost"),
            image_path: text("image_url"),
            contact_info: text("contact_info"),
            status,
            created_at,
            expires_at,
        })
    }

    /// Construct an item from a database row. A NULL status reads as active.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get("type")?;
        let status = match row.get::<_, Option<String>>("status")? {
            Some(raw) => raw.parse().map_err(column_err)?,
            None => LostFoundStatus::Active,
        };
        Ok(Self {
            id: row.get("id")?,
            kind: kind.parse().map_err(column_err)?,
            item_name: row.get("item_name")?,
            description: row.get("description")?,
            category: row.get("category")?,
            location_lost: row.get("location_lost")?,
            image_path: row.get("image_path")?,
            contact_info: row.get("contact_info")?,
            status,
            created_at: get_optional_timestamp(row, "created_at")?.unwrap_or_default(),
            expires_at: get_optional_timestamp(row, "expires_at")?,
        })
    }

    /// Replace every row with `items`, keeping their remote ids.
    ///
    /// The caller supplies the transaction boundary. Returns `(removed, inserted)`.
    pub fn replace_all(conn: &Connection, items: &[LostFoundItem]) -> CcResult<(usize, usize)> {
        let removed = conn.execute("DELETE FROM lost_found", []).map_err(write_err)?;

        let mut stmt = conn
            .prepare(
                "INSERT INTO lost_found (id, type, item_name, description, category, location_lost,
                                         image_path, contact_info, status, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )
            .map_err(write_err)?;

        for item in items {
            stmt.execute(params![
                item.id,
                item.kind.as_str(),
                item.item_name,
                item.description,
                item.category,
                item.location_lost,
                item.image_path,
                item.contact_info,
                item.status.as_str(),
                format_timestamp(&item.created_at),
                item.expires_at.as_ref().map(format_timestamp),
            ])
            .map_err(write_err)?;
        }

        Ok((removed, items.len()))
    }

    /// Active postings matching `filter`, newest first.
    pub fn active(conn: &Connection, filter: &LostFoundFilter) -> CcResult<Vec<Self>> {
        let mut stmt = conn
            .prepare(&format!(
                "{SELECT_ITEMS}
                 WHERE COALESCE(status, 'active') = 'active'
                   AND (?1 IS NULL OR type = ?1)
                   AND (?2 IS NULL OR category = ?2)
                 ORDER BY datetime(created_at) DESC, id DESC
                 LIMIT ?3"
            ))
            .map_err(db_err)?;

        let limit = filter.limit.map_or(-1, i64::from);
        let items = stmt
            .query_map(
                params![filter.kind.map(|k| k.as_str()), filter.category, limit],
                Self::from_row,
            )
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(items)
    }

    /// Find a posting by id, whatever its status.
    pub fn find(conn: &Connection, id: i64) -> CcResult<Option<Self>> {
        match conn.query_row(&format!("{SELECT_ITEMS} WHERE id = ?1"), [id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Mark active postings whose expiry has passed as expired.
    /// Returns the ids that changed.
    pub fn expire_overdue(conn: &Connection, now: DateTime<Utc>) -> CcResult<Vec<i64>> {
        let mut stmt = conn
            .prepare(
                "UPDATE lost_found SET status = 'expired'
                 WHERE COALESCE(status, 'active') = 'active'
                   AND expires_at IS NOT NULL AND expires_at != ''
                   AND datetime(expires_at) < datetime(?1)
                 RETURNING id",
            )
            .map_err(write_err)?;
        let mut ids = stmt
            .query_map([format_timestamp(&now)], |row| row.get::<_, i64>(0))
            .map_err(write_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(write_err)?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Total row count, all statuses.
    pub fn count(conn: &Connection) -> CcResult<i64> {
        conn.query_row("SELECT COUNT(*) FROM lost_found", [], |row| row.get(0))
            .map_err(db_err)
    }
}
