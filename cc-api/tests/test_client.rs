//! Integration tests for the API client against a mock HTTP server.

use chrono::{Duration, Utc};
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;

use cc_api::{ApiClient, EventScope, LostFoundPatch, NewLostFoundItem};
use cc_core::config::ServerConfig;
use cc_core::error::CcError;
use cc_models::{EventSource, LostFoundFilter, LostFoundKind, LostFoundStatus};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ServerConfig {
        base_url: server.url("/api"),
        ..ServerConfig::default()
    })
    .unwrap()
}

fn event_json(id: i64, title: &str, start: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "category": "Academic",
        "location": "Room 1190",
        "start_time": start,
        "end_time": null,
        "source": "email",
        "created_at": "2025-09-01T00:00:00.000Z"
    })
}

fn item_json(id: i64, kind: &str, name: &str, created: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": kind,
        "item_name": name,
        "description": "",
        "category": "Other",
        "location_lost": "",
        "image_url": null,
        "contact_info": "",
        "status": "active",
        "created_at": created,
        "expires_at": "2099-01-01T00:00:00.000Z"
    })
}

#[tokio::test]
async fn test_get_upcoming_events() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/events/upcoming")
                .query_param("limit", "100");
            then.status(200).json_body(json!({
                "success": true,
                "count": 2,
                "data": [
                    event_json(2, "Later", "2025-09-15T14:00:00.000Z"),
                    event_json(1, "Sooner", "2025-09-15T09:00:00.000Z"),
                ]
            }));
        })
        .await;

    let events = client_for(&server)
        .get_events(&EventScope::Upcoming { limit: 100 })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].title, "Sooner");
    assert!(events.iter().all(|e| e.source == EventSource::Api));
}

#[tokio::test]
async fn test_get_events_skips_malformed_rows() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/events/today");
            then.status(200).json_body(json!({
                "success": true,
                "data": [
                    event_json(1, "Valid", "2025-09-15T09:00:00.000Z"),
                    { "id": 2, "title": "No start" }
                ]
            }));
        })
        .await;

    let events = client_for(&server).get_events(&EventScope::Today).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_get_event_by_id_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/events/999");
            then.status(404)
                .json_body(json!({ "success": false, "error": "Event not found" }));
        })
        .await;

    let err = client_for(&server).get_event(999).await.unwrap_err();
    match err {
        CcError::NotFound(message) => assert_eq!(message, "Event not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_rejected_with_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/lost-found");
            then.status(500)
                .json_body(json!({ "success": false, "error": "Failed to fetch items" }));
        })
        .await;

    let err = client_for(&server)
        .get_lost_found_items(&LostFoundFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CcError::RemoteRejected { status: 500, ref message } if message == "Failed to fetch items"
    ));
    assert!(err.is_remote());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    let client = ApiClient::new(&ServerConfig {
        base_url: "http://127.0.0.1:1/api".into(),
        connect_timeout_ms: 500,
        api_timeout_ms: 1_000,
    })
    .unwrap();

    let err = client.get_events(&EventScope::Today).await.unwrap_err();
    assert!(matches!(err, CcError::RemoteUnavailable(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_list_lost_found_with_filter() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/lost-found")
                .query_param("type", "lost")
                .query_param("limit", "200");
            then.status(200).json_body(json!({
                "success": true,
                "count": 2,
                "data": [
                    item_json(1, "lost", "Older", "2025-10-01T08:00:00.000Z"),
                    item_json(2, "lost", "Newer", "2025-10-02T08:00:00.000Z"),
                ]
            }));
        })
        .await;

    let filter = LostFoundFilter {
        kind: Some(LostFoundKind::Lost),
        category: None,
        limit: Some(200),
    };
    let items = client_for(&server).get_lost_found_items(&filter).await.unwrap();

    mock.assert_async().await;
    let names: Vec<_> = items.iter().map(|i| i.item_name.as_str()).collect();
    assert_eq!(names, vec!["Newer", "Older"]);
}

#[tokio::test]
async fn test_create_sends_default_expiry() {
    let server = MockServer::start_async().await;
    let expires = (Utc::now() + Duration::days(30)).to_rfc3339();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/lost-found")
                .body_contains("\"type\":\"found\"")
                .body_contains("\"item_name\":\"Blue umbrella\"")
                .body_contains("\"expires_at\"");
            then.status(201).json_body(json!({
                "success": true,
                "message": "Item created successfully",
                "data": {
                    "id": 77,
                    "type": "found",
                    "item_name": "Blue umbrella",
                    "status": "active",
                    "created_at": Utc::now().to_rfc3339(),
                    "expires_at": expires
                }
            }));
        })
        .await;

    let created = client_for(&server)
        .create_lost_found_item(NewLostFoundItem::new(LostFoundKind::Found, "Blue umbrella"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, 77);
    let ttl = created.expires_at.unwrap() - created.created_at;
    assert!((ttl - Duration::days(30)).num_seconds().abs() <= 1);
}

#[tokio::test]
async fn test_create_validates_before_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/lost-found");
            then.status(201);
        })
        .await;

    let err = client_for(&server)
        .create_lost_found_item(NewLostFoundItem::new(LostFoundKind::Lost, ""))
        .await
        .unwrap_err();

    assert!(matches!(err, CcError::Validation(_)));
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn test_update_and_resolve() {
    let server = MockServer::start_async().await;
    let mut resolved = item_json(5, "lost", "Laptop charger", "2025-10-01T08:00:00.000Z");
    resolved["status"] = json!("resolved");

    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/lost-found/5")
                .json_body(json!({ "location_lost": "Library 2F" }));
            then.status(200).json_body(json!({
                "success": true,
                "data": item_json(5, "lost", "Laptop charger", "2025-10-01T08:00:00.000Z")
            }));
        })
        .await;
    let resolve = server
        .mock_async(|when, then| {
            when.method(PATCH).path("/api/lost-found/5/resolve");
            then.status(200)
                .json_body(json!({ "success": true, "data": resolved }));
        })
        .await;

    let client = client_for(&server);
    let patch = LostFoundPatch {
        location_lost: Some("Library 2F".into()),
        ..Default::default()
    };
    client.update_lost_found_item(5, &patch).await.unwrap();
    let item = client.resolve_lost_found_item(5).await.unwrap();

    update.assert_async().await;
    resolve.assert_async().await;
    assert_eq!(item.status, LostFoundStatus::Resolved);
}

#[tokio::test]
async fn test_empty_patch_rejected_locally() {
    let server = MockServer::start_async().await;
    let err = client_for(&server)
        .update_lost_found_item(5, &LostFoundPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CcError::Validation(_)));
}

#[tokio::test]
async fn test_delete_and_cleanup() {
    let server = MockServer::start_async().await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/lost-found/3");
            then.status(200)
                .json_body(json!({ "success": true, "message": "Item deleted successfully" }));
        })
        .await;
    let cleanup = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/lost-found/cleanup");
            then.status(200).json_body(json!({
                "success": true,
                "message": "Marked 2 items as expired",
                "data": [{ "id": 9 }, { "id": 12 }]
            }));
        })
        .await;

    let client = client_for(&server);
    client.delete_lost_found_item(3).await.unwrap();
    let expired = client.cleanup_expired().await.unwrap();

    delete.assert_async().await;
    cleanup.assert_async().await;
    assert_eq!(expired, vec![9, 12]);
}

#[tokio::test]
async fn test_cleanup_with_nothing_expired() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/lost-found/cleanup");
            then.status(200)
                .json_body(json!({ "success": true, "message": "Marked 0 items as expired", "data": [] }));
        })
        .await;

    let expired = client_for(&server).cleanup_expired().await.unwrap();
    assert!(expired.is_empty());
}

#[tokio::test]
async fn test_delete_missing_item() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/lost-found/404");
            then.status(404)
                .json_body(json!({ "success": false, "error": "Item not found" }));
        })
        .await;

    let err = client_for(&server).delete_lost_found_item(404).await.unwrap_err();
    assert!(matches!(err, CcError::NotFound(_)));
}
