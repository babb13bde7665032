//! Lost & found endpoints.

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::Serialize;
use tracing::{info, warn};

use cc_core::constants::LOST_FOUND_DEFAULT_TTL_DAYS;
use cc_core::error::{CcError, CcResult};
use cc_models::{LostFoundFilter, LostFoundItem, LostFoundKind, LostFoundStatus};

use crate::client::ApiClient;

/// Body for creating a posting.
#[derive(Debug, Clone, Serialize)]
pub struct NewLostFoundItem {
    #[serde(rename = "type")]
    pub kind: LostFoundKind,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewLostFoundItem {
    pub fn new(kind: LostFoundKind, item_name: impl Into<String>) -> Self {
        Self {
            kind,
            item_name: item_name.into(),
            description: None,
            category: None,
            location_lost: None,
            image_url: None,
            contact_info: None,
            expires_at: None,
        }
    }

    /// Validate and fill in the default expiry relative to `now`.
    pub fn prepared(mut self, now: DateTime<Utc>) -> CcResult<Self> {
        self.item_name = self.item_name.trim().to_string();
        if self.item_name.is_empty() {
            return Err(CcError::Validation("item name is required".into()));
        }
        if self.expires_at.is_none() {
            self.expires_at = Some(now + Duration::days(LOST_FOUND_DEFAULT_TTL_DAYS));
        }
        Ok(self)
    }
}

/// Partial update. Only fields the server accepts are representable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LostFoundPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LostFoundStatus>,
}

impl LostFoundPatch {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.location_lost.is_none()
            && self.image_url.is_none()
            && self.contact_info.is_none()
            && self.status.is_none()
    }
}

fn filter_query(filter: &LostFoundFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(kind) = filter.kind {
        query.push(("type", kind.as_str().to_string()));
    }
    if let Some(category) = &filter.category {
        query.push(("category", category.clone()));
    }
    if let Some(limit) = filter.limit {
        query.push(("limit", limit.to_string()));
    }
    query
}

fn to_body<T: Serialize>(value: &T) -> CcResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| CcError::Serialization(e.to_string()))
}

fn parse_items(raw: &[serde_json::Value]) -> Vec<LostFoundItem> {
    raw.iter()
        .filter_map(|value| match LostFoundItem::from_server_map(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("skipping malformed lost & found item from server: {e}");
                None
            }
        })
        .collect()
}

impl ApiClient {
    /// Active postings matching `filter`, newest first.
    pub async fn get_lost_found_items(&self, filter: &LostFoundFilter) -> CcResult<Vec<LostFoundItem>> {
        let raw: Vec<serde_json::Value> = self
            .request(Method::GET, &["lost-found"], &filter_query(filter), None)
            .await?
            .unwrap_or_default();
        let mut items = parse_items(&raw);
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    /// A single posting by id.
    pub async fn get_lost_found_item(&self, id: i64) -> CcResult<LostFoundItem> {
        let id = id.to_string();
        let raw: serde_json::Value = self
            .request_data(Method::GET, &["lost-found", id.as_str()], &[], None)
            .await?;
        LostFoundItem::from_server_map(&raw)
    }

    /// Create a posting. Expiry defaults to 30 days from now.
    pub async fn create_lost_found_item(&self, item: NewLostFoundItem) -> CcResult<LostFoundItem> {
        let item = item.prepared(Utc::now())?;
        let body = to_body(&item)?;
        let raw: serde_json::Value = self
            .request_data(Method::POST, &["lost-found"], &[], Some(&body))
            .await?;
        let created = LostFoundItem::from_server_map(&raw)?;
        info!("created {} item {} ({})", created.kind, created.id, created.item_name);
        Ok(created)
    }

    /// Apply a partial update.
    pub async fn update_lost_found_item(
        &self,
        id: i64,
        patch: &LostFoundPatch,
    ) -> CcResult<LostFoundItem> {
        if patch.is_empty() {
            return Err(CcError::Validation("update has no fields".into()));
        }
        let body = to_body(patch)?;
        let id = id.to_string();
        let raw: serde_json::Value = self
            .request_data(Method::PUT, &["lost-found", id.as_str()], &[], Some(&body))
            .await?;
        LostFoundItem::from_server_map(&raw)
    }

    /// Mark a posting resolved.
    pub async fn resolve_lost_found_item(&self, id: i64) -> CcResult<LostFoundItem> {
        let id = id.to_string();
        let raw: serde_json::Value = self
            .request_data(Method::PATCH, &["lost-found", id.as_str(), "resolve"], &[], None)
            .await?;
        LostFoundItem::from_server_map(&raw)
    }

    pub async fn delete_lost_found_item(&self, id: i64) -> CcResult<()> {
        let id = id.to_string();
        self.request::<serde_json::Value>(Method::DELETE, &["lost-found", id.as_str()], &[], None)
            .await?;
        Ok(())
    }

    /// Ask the server to expire overdue postings. Returns the ids it expired.
    ///
    /// The server answers with `[{"id": n}, ...]`, not full rows.
    pub async fn cleanup_expired(&self) -> CcResult<Vec<i64>> {
        let raw: Vec<serde_json::Value> = self
            .request(Method::POST, &["lost-found", "cleanup"], &[], None)
            .await?
            .unwrap_or_default();
        raw.iter()
            .map(|row| {
                row.get("id").and_then(|v| v.as_i64()).ok_or_else(|| {
                    CcError::Serialization(format!("cleanup row without id: {row}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_prepared_defaults_expiry() {
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        let item = NewLostFoundItem::new(LostFoundKind::Lost, " Wallet ")
            .prepared(now)
            .unwrap();
        assert_eq!(item.item_name, "Wallet");
        assert_eq!(item.expires_at, Some(Utc.with_ymd_and_hms(2025, 10, 31, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_prepared_keeps_explicit_expiry() {
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        let explicit = now + Duration::days(3);
        let mut item = NewLostFoundItem::new(LostFoundKind::Found, "Keys");
        item.expires_at = Some(explicit);
        assert_eq!(item.prepared(now).unwrap().expires_at, Some(explicit));
    }

    #[test]
    fn test_prepared_requires_name() {
        let now = Utc::now();
        assert!(matches!(
            NewLostFoundItem::new(LostFoundKind::Lost, "   ").prepared(now),
            Err(CcError::Validation(_))
        ));
    }

    #[test]
    fn test_new_item_body_uses_type_key() {
        let item = NewLostFoundItem::new(LostFoundKind::Found, "Umbrella");
        let body = to_body(&item).unwrap();
        assert_eq!(body["type"], "found");
        assert!(body.get("description").is_none());
    }

    #[test]
    fn test_patch_only_serializes_set_fields() {
        let patch = LostFoundPatch {
            status: Some(LostFoundStatus::Resolved),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        let body = to_body(&patch).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "resolved" }));
        assert!(LostFoundPatch::default().is_empty());
    }

    #[test]
    fn test_filter_query() {
        let filter = LostFoundFilter {
            kind: Some(LostFoundKind::Lost),
            category: Some("Electronics".into()),
            limit: Some(200),
        };
        assert_eq!(
            filter_query(&filter),
            vec![
                ("type", "lost".to_string()),
                ("category", "Electronics".to_string()),
                ("limit", "200".to_string()),
            ]
        );
    }
}
