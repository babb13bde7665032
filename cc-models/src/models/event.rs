//! Calendar event entity model.
//!
//! Events come from two places: manual entry on the device (`source =
//! 'manual'`) and the remote collection (`source = 'api'`). Sync replaces the
//! `api` rows wholesale and never touches the `manual` ones.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use cc_core::constants::categories;
use cc_core::error::{CcError, CcResult};

use crate::time::{self, format_timestamp, get_optional_timestamp, get_timestamp};

/// Provenance tag of an event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Entered on this device. Never touched by sync.
    Manual,
    /// Mirrored from the remote collection.
    Api,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = CcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "api" => Ok(Self::Api),
            other => Err(CcError::Validation(format!("unknown event source {other:?}"))),
        }
    }
}

/// A calendar event as held in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Local row id. For events fetched but not yet stored, the remote id.
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    /// Free-form; any value from the ingestion pipeline is accepted.
    pub category: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub source: EventSource,
    pub created_at: DateTime<Utc>,
}

/// Fields a user supplies when entering an event by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

const SELECT_EVENTS: &str = "SELECT id, title, description, category, location, start_time, \
     end_time, link, source, created_at FROM events";

fn db_err(e: rusqlite::Error) -> CcError {
    CcError::Database(e.to_string())
}

fn write_err(e: rusqlite::Error) -> CcError {
    CcError::LocalWriteFailed(e.to_string())
}

impl Event {
    /// Build an Event from a server JSON object. The result is tagged `api`
    /// whatever the server's own source field says.
    pub fn from_server_map(map: &serde_json::Value) -> CcResult<Self> {
        let text = |key: &str| {
            map.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let timestamp = |key: &str| map.get(key).and_then(|v| v.as_str()).and_then(time::parse_timestamp);

        let title = text("title")
            .ok_or_else(|| CcError::Serialization("event missing title".into()))?;
        let start_time = timestamp("start_time").ok_or_else(|| {
            CcError::Serialization(format!("event {title:?} missing or invalid start_time"))
        })?;

        Ok(Self {
            id: map.get("id").and_then(|v| v.as_i64()),
            title,
            description: text("description").unwrap_or_default(),
            category: text("category").unwrap_or_else(|| categories::OTHER.to_string()),
            location: text("location").unwrap_or_default(),
            start_time,
            end_time: timestamp("end_time"),
            link: text("link"),
            source: EventSource::Api,
            // Fall back to a remote-derived value so repeated syncs store the same row.
            created_at: timestamp("created_at").unwrap_or(start_time),
        })
    }

    /// Construct an Event from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let source: Option<String> = row.get("source")?;
        Ok(Self {
            id: Some(row.get("id")?),
            title: row.get("title")?,
            description: row.get::<_, Option<String>>("description")?.unwrap_or_default(),
            category: row
                .get::<_, Option<String>>("category")?
                .unwrap_or_else(|| categories::OTHER.to_string()),
            location: row.get::<_, Option<String>>("location")?.unwrap_or_default(),
            start_time: get_timestamp(row, "start_time")?,
            end_time: get_optional_timestamp(row, "end_time")?,
            link: row.get("link")?,
            source: match source.as_deref() {
                Some("api") => EventSource::Api,
                _ => EventSource::Manual,
            },
            created_at: get_optional_timestamp(row, "created_at")?.unwrap_or_default(),
        })
    }

    /// Whether this event was entered on the device.
    pub fn is_manual(&self) -> bool {
        self.source == EventSource::Manual
    }

    /// Store a hand-entered event, tagged `manual`.
    pub fn insert_manual(conn: &Connection, new: &NewEvent, now: DateTime<Utc>) -> CcResult<Self> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(CcError::Validation("event title is required".into()));
        }
        let start_time = new
            .start_time
            .ok_or_else(|| CcError::Validation("event start time is required".into()))?;
        if matches!(new.end_time, Some(end) if end < start_time) {
            return Err(CcError::Validation("event ends before it starts".into()));
        }

        let mut event = Self {
            id: None,
            title: title.to_string(),
            description: new.description.clone().unwrap_or_default(),
            category: new
                .category
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| categories::OTHER.to_string()),
            location: new.location.clone().unwrap_or_default(),
            start_time,
            end_time: new.end_time,
            link: new.link.clone().filter(|l| !l.trim().is_empty()),
            source: EventSource::Manual,
            created_at: now,
        };

        conn.execute(
            "INSERT INTO events (title, description, category, location, start_time, end_time, link, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.title,
                event.description,
                event.category,
                event.location,
                format_timestamp(&event.start_time),
                event.end_time.as_ref().map(format_timestamp),
                event.link,
                event.source.as_str(),
                format_timestamp(&event.created_at),
            ],
        )
        .map_err(write_err)?;

        event.id = Some(conn.last_insert_rowid());
        Ok(event)
    }

    /// Replace every `api` row with `events`. Manual rows are left alone.
    ///
    /// Runs a single prepared insert per row. The caller supplies the
    /// transaction boundary; on error nothing here is undone.
    /// Returns `(removed, inserted)`.
    pub fn replace_api_rows(conn: &Connection, events: &[Event]) -> CcResult<(usize, usize)> {
        let removed = conn
            .execute("DELETE FROM events WHERE source = ?1", [EventSource::Api.as_str()])
            .map_err(write_err)?;

        let mut stmt = conn
            .prepare(
                "INSERT INTO events (title, description, category, location, start_time, end_time, link, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .map_err(write_err)?;

        for event in events {
            stmt.execute(params![
                event.title,
                event.description,
                event.category,
                event.location,
                format_timestamp(&event.start_time),
                event.end_time.as_ref().map(format_timestamp),
                event.link,
                EventSource::Api.as_str(),
                format_timestamp(&event.created_at),
            ])
            .map_err(write_err)?;
        }

        Ok((removed, events.len()))
    }

    /// Events starting on `day` (UTC), ascending by start time.
    pub fn today(conn: &Connection, day: NaiveDate) -> CcResult<Vec<Self>> {
        let (start, end) = time::day_bounds(day);
        Self::in_range(conn, start, end)
    }

    /// Events starting in `[start, end)`, ascending by start time.
    pub fn in_range(
        conn: &Connection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CcResult<Vec<Self>> {
        Self::query(
            conn,
            &format!(
                "{SELECT_EVENTS}
                 WHERE datetime(start_time) >= datetime(?1) AND datetime(start_time) < datetime(?2)
                 ORDER BY datetime(start_time) ASC, id ASC"
            ),
            params![format_timestamp(&start), format_timestamp(&end)],
        )
    }

    /// Events starting at or after `from`, ascending, at most `limit`.
    pub fn upcoming(conn: &Connection, from: DateTime<Utc>, limit: u32) -> CcResult<Vec<Self>> {
        Self::query(
            conn,
            &format!(
                "{SELECT_EVENTS}
                 WHERE datetime(start_time) >= datetime(?1)
                 ORDER BY datetime(start_time) ASC, id ASC
                 LIMIT ?2"
            ),
            params![format_timestamp(&from), limit],
        )
    }

    /// Upcoming events in one category.
    pub fn by_category(
        conn: &Connection,
        category: &str,
        from: DateTime<Utc>,
    ) -> CcResult<Vec<Self>> {
        Self::query(
            conn,
            &format!(
                "{SELECT_EVENTS}
                 WHERE category = ?1 AND datetime(start_time) >= datetime(?2)
                 ORDER BY datetime(start_time) ASC, id ASC"
            ),
            params![category, format_timestamp(&from)],
        )
    }

    /// Every stored event, ascending by start time.
    pub fn all(conn: &Connection) -> CcResult<Vec<Self>> {
        Self::query(
            conn,
            &format!("{SELECT_EVENTS} ORDER BY datetime(start_time) ASC, id ASC"),
            [],
        )
    }

    /// Find an event by local row id.
    pub fn find(conn: &Connection, id: i64) -> CcResult<Option<Self>> {
        match conn.query_row(&format!("{SELECT_EVENTS} WHERE id = ?1"), [id], Self::from_row) {
            Ok(event) => Ok(Some(event)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Number of rows carrying a provenance tag.
    pub fn count_by_source(conn: &Connection, source: EventSource) -> CcResult<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM events WHERE source = ?1",
            [source.as_str()],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    /// Delete a manual event. Mirrored rows are owned by sync and cannot be
    /// deleted this way.
    pub fn delete_manual(conn: &Connection, id: i64) -> CcResult<bool> {
        let changed = conn
            .execute(
                "DELETE FROM events WHERE id = ?1 AND source = ?2",
                params![id, EventSource::Manual.as_str()],
            )
            .map_err(write_err)?;
        Ok(changed > 0)
    }

    fn query<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> CcResult<Vec<Self>> {
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let events = stmt
            .query_map(params, Self::from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(events)
    }
}
