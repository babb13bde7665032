//! Event endpoints. The remote event collection is read-only.

use chrono::{DateTime, Utc};
use reqwest::Method;
use tracing::warn;

use cc_core::error::CcResult;
use cc_models::time::format_timestamp;
use cc_models::Event;

use crate::client::ApiClient;

/// Which slice of the remote event collection to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventScope {
    /// Events starting today, server time.
    Today,
    /// The next `limit` upcoming events.
    Upcoming { limit: u32 },
    /// Events starting between `start` and `end`.
    DateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Upcoming events in one category.
    ByCategory(String),
    /// A single event.
    ById(i64),
}

impl EventScope {
    fn segments(&self) -> Vec<String> {
        match self {
            Self::Today => vec!["events".into(), "today".into()],
            Self::Upcoming { .. } => vec!["events".into(), "upcoming".into()],
            Self::DateRange { .. } => vec!["events".into(), "range".into()],
            Self::ByCategory(name) => vec!["events".into(), "category".into(), name.clone()],
            Self::ById(id) => vec!["events".into(), id.to_string()],
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Upcoming { limit } => vec![("limit", limit.to_string())],
            Self::DateRange { start, end } => vec![
                ("start_date", format_timestamp(start)),
                ("end_date", format_timestamp(end)),
            ],
            _ => Vec::new(),
        }
    }
}

impl ApiClient {
    /// Fetch events for a scope, ascending by start time.
    ///
    /// Rows the server sends without a title or a parseable start time are
    /// skipped with a warning. A `ById` scope yields at most one event and
    /// fails with `NotFound` if the id does not exist.
    pub async fn get_events(&self, scope: &EventScope) -> CcResult<Vec<Event>> {
        let segments = scope.segments();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let query = scope.query();

        let raw: Vec<serde_json::Value> = match scope {
            EventScope::ById(_) => vec![self.request_data(Method::GET, &segments, &query, None).await?],
            _ => self
                .request(Method::GET, &segments, &query, None)
                .await?
                .unwrap_or_default(),
        };

        let mut events: Vec<Event> = raw
            .iter()
            .filter_map(|value| match Event::from_server_map(value) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("skipping malformed event from server: {e}");
                    None
                }
            })
            .collect();
        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }

    /// Fetch a single event by remote id.
    pub async fn get_event(&self, id: i64) -> CcResult<Event> {
        let id = id.to_string();
        let raw: serde_json::Value = self
            .request_data(Method::GET, &["events", id.as_str()], &[], None)
            .await?;
        Event::from_server_map(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scope_paths() {
        assert_eq!(EventScope::Today.segments(), vec!["events", "today"]);
        assert_eq!(
            EventScope::ByCategory("Sports".into()).segments(),
            vec!["events", "category", "Sports"]
        );
        assert_eq!(EventScope::ById(12).segments(), vec!["events", "12"]);
    }

    #[test]
    fn test_scope_query() {
        assert_eq!(
            EventScope::Upcoming { limit: 100 }.query(),
            vec![("limit", "100".to_string())]
        );
        let start = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 9, 8, 0, 0, 0).unwrap();
        let query = EventScope::DateRange { start, end }.query();
        assert_eq!(query[0], ("start_date", "2025-09-01T00:00:00.000Z".to_string()));
        assert_eq!(query[1], ("end_date", "2025-09-08T00:00:00.000Z".to_string()));
        assert!(EventScope::Today.query().is_empty());
    }
}
