//! Class schedule entity model.
//!
//! Schedule entries are entered on the device and never synced.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use cc_core::error::{CcError, CcResult};

/// Default accent color for a course block.
pub const DEFAULT_COLOR: &str = "#3B82F6";

/// A weekly class meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Option<i64>,
    pub course_code: String,
    pub course_name: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: Option<u8>,
    /// Wall-clock `HH:MM`.
    pub start_time: String,
    pub end_time: String,
    pub color: String,
}

impl ScheduleEntry {
    pub fn new(course_code: &str, day_of_week: u8, start_time: &str, end_time: &str) -> Self {
        Self {
            id: None,
            course_code: course_code.to_string(),
            course_name: None,
            instructor: None,
            location: None,
            day_of_week: Some(day_of_week),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            color: DEFAULT_COLOR.to_string(),
        }
    }

    /// Construct a ScheduleEntry from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            course_code: row.get("course_code")?,
            course_name: row.get("course_name")?,
            instructor: row.get("instructor")?,
            location: row.get("location")?,
            day_of_week: row
                .get::<_, Option<i64>>("day_of_week")?
                .and_then(|d| u8::try_from(d).ok()),
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            color: row
                .get::<_, Option<String>>("color")?
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        })
    }

    fn validate(&self) -> CcResult<()> {
        if self.course_code.trim().is_empty() {
            return Err(CcError::Validation("course code is required".into()));
        }
        if matches!(self.day_of_week, Some(d) if d > 6) {
            return Err(CcError::Validation("day of week must be 0-6".into()));
        }
        let start = parse_clock(&self.start_time)?;
        let end = parse_clock(&self.end_time)?;
        if end <= start {
            return Err(CcError::Validation("class ends before it starts".into()));
        }
        Ok(())
    }

    /// Insert this entry. Sets `self.id` on success.
    pub fn insert(&mut self, conn: &Connection) -> CcResult<i64> {
        self.validate()?;
        conn.execute(
            "INSERT INTO schedule (course_code, course_name, instructor, location, day_of_week, start_time, end_time, color)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.course_code.trim(),
                self.course_name,
                self.instructor,
                self.location,
                self.day_of_week,
                self.start_time,
                self.end_time,
                self.color,
            ],
        )
        .map_err(|e| CcError::LocalWriteFailed(e.to_string()))?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Every entry, by day then start time.
    pub fn all(conn: &Connection) -> CcResult<Vec<Self>> {
        Self::query(
            conn,
            "SELECT * FROM schedule ORDER BY day_of_week ASC, start_time ASC, id ASC",
            [],
        )
    }

    /// Entries meeting on `day` (0 = Sunday), by start time.
    pub fn for_day(conn: &Connection, day: u8) -> CcResult<Vec<Self>> {
        Self::query(
            conn,
            "SELECT * FROM schedule WHERE day_of_week = ?1 ORDER BY start_time ASC, id ASC",
            [day],
        )
    }

    pub fn delete(conn: &Connection, id: i64) -> CcResult<bool> {
        let changed = conn
            .execute("DELETE FROM schedule WHERE id = ?1", [id])
            .map_err(|e| CcError::LocalWriteFailed(e.to_string()))?;
        Ok(changed > 0)
    }

    fn query<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> CcResult<Vec<Self>> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| CcError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params, Self::from_row)
            .map_err(|e| CcError::Database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CcError::Database(e.to_string()))?;
        Ok(rows)
    }
}

fn parse_clock(raw: &str) -> CcResult<chrono::NaiveTime> {
    chrono::NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| CcError::Validation(format!("expected HH:MM, got {raw:?}")))
}
