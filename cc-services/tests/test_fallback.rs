//! Integration tests for the sync-then-read-local fallback.

mod common;

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;

use cc_api::ApiClient;
use cc_core::config::ServerConfig;
use cc_core::error::CcError;
use cc_models::{EventSource, LostFoundFilter, LostFoundItem, LostFoundKind, LostFoundStatus};
use cc_services::{AppEvent, Collection, ConnectivityService, EventView, SyncService};

use common::{at, harness, remote_event, remote_item, FakeRemote, Reply};

fn sept_15() -> EventView {
    EventView::Today(NaiveDate::from_ymd_opt(2025, 9, 15).unwrap())
}

#[tokio::test]
async fn test_three_events_today_in_order() {
    let remote = FakeRemote::new();
    // Out of order on the wire.
    remote.push_events(Reply::Rows(vec![
        remote_event(3, "Club Meeting", at(14, 0)),
        remote_event(1, "Career Fair", at(9, 0)),
        remote_event(2, "Guest Lecture", at(11, 0)),
    ]));
    let h = harness(remote);

    let events = h.connectivity.load_events(&sept_15()).await.unwrap();
    let starts: Vec<_> = events.iter().map(|e| e.start_time).collect();
    assert_eq!(starts, vec![at(9, 0), at(11, 0), at(14, 0)]);
    assert!(events.iter().all(|e| e.source == EventSource::Api));
    assert!(h.connectivity.is_online());
}

#[tokio::test]
async fn test_offline_serves_cached_rows() {
    let remote = FakeRemote::new();
    remote.push_events(Reply::Rows(vec![
        remote_event(1, "Career Fair", at(9, 0)),
        remote_event(2, "Guest Lecture", at(11, 0)),
    ]));
    remote.push_events(Reply::Unavailable);
    let h = harness(remote);

    let online = h.connectivity.load_events(&sept_15()).await.unwrap();
    let offline = h.connectivity.load_events(&sept_15()).await.unwrap();

    assert_eq!(offline, online);
    assert!(!h.connectivity.is_online());
}

#[tokio::test]
async fn test_offline_with_empty_store_is_not_an_error() {
    let remote = FakeRemote::new();
    remote.push_events(Reply::Rejected(500));
    let h = harness(remote);

    let events = h.connectivity.load_events(&sept_15()).await.unwrap();
    assert!(events.is_empty());
    assert!(!h.connectivity.is_online());
}

#[tokio::test]
async fn test_offline_then_online_emits_changes() {
    let remote = FakeRemote::new();
    remote.push_events(Reply::Rejected(502));
    remote.push_events(Reply::Rows(vec![remote_event(1, "Career Fair", at(9, 0))]));
    let h = harness(remote);
    let mut events = h.bus.subscribe();

    assert!(!h.connectivity.refresh(Collection::Events).await.unwrap());
    assert!(!h.connectivity.is_online());
    assert!(h.connectivity.refresh(Collection::Events).await.unwrap());
    assert!(h.connectivity.is_online());

    let mut flips = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let AppEvent::ConnectivityChanged { online } = event {
            flips.push(online);
        }
    }
    assert_eq!(flips, vec![false, true]);
}

#[tokio::test]
async fn test_local_error_propagates() {
    let remote = FakeRemote::new();
    remote.push_events(Reply::Rows(vec![remote_event(1, "boom", at(9, 0))]));
    let h = harness(remote);

    {
        let conn = h.db.conn().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON events
             WHEN NEW.title = 'boom'
             BEGIN SELECT RAISE(ABORT, 'boom'); END;",
        )
        .unwrap();
    }

    let err = h.connectivity.load_events(&sept_15()).await.unwrap_err();
    assert!(matches!(err, CcError::LocalWriteFailed(_)));
    // A local failure says nothing about the remote.
    assert!(h.connectivity.is_online());
}

#[tokio::test]
async fn test_load_lost_found_expires_overdue() {
    let mut overdue = remote_item(1, LostFoundKind::Lost, "Umbrella", at(8, 0));
    overdue.expires_at = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    let fresh = remote_item(2, LostFoundKind::Found, "Water bottle", at(9, 0));

    let remote = FakeRemote::new();
    remote.push_lost_found(Reply::Rows(vec![overdue, fresh]));
    let h = harness(remote);
    let mut events = h.bus.subscribe();

    let items = h
        .connectivity
        .load_lost_found(&LostFoundFilter::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_name, "Water bottle");

    let conn = h.db.conn().unwrap();
    let umbrella = LostFoundItem::find(&conn, 1).unwrap().unwrap();
    assert_eq!(umbrella.status, LostFoundStatus::Expired);

    let mut expired = None;
    while let Ok(event) = events.try_recv() {
        if let AppEvent::LostFoundExpired { ids } = event {
            expired = Some(ids);
        }
    }
    assert_eq!(expired, Some(vec![1]));
}

#[tokio::test]
async fn test_load_lost_found_filters_by_kind_offline() {
    let remote = FakeRemote::new();
    remote.push_lost_found(Reply::Rows(vec![
        remote_item(1, LostFoundKind::Lost, "Blue backpack", at(8, 0)),
        remote_item(2, LostFoundKind::Found, "Keys", at(9, 0)),
        remote_item(3, LostFoundKind::Lost, "Calculator", at(10, 0)),
    ]));
    remote.push_lost_found(Reply::Unavailable);
    let h = harness(remote);

    h.connectivity
        .load_lost_found(&LostFoundFilter::default())
        .await
        .unwrap();

    let lost = h
        .connectivity
        .load_lost_found(&LostFoundFilter::kind(LostFoundKind::Lost))
        .await
        .unwrap();
    let names: Vec<_> = lost.iter().map(|i| i.item_name.as_str()).collect();
    assert_eq!(names, vec!["Calculator", "Blue backpack"]);
    assert!(!h.connectivity.is_online());
}

#[tokio::test]
async fn test_refresh_all_online_if_any_succeeds() {
    let remote = FakeRemote::new();
    remote.push_events(Reply::Rows(vec![remote_event(1, "Career Fair", at(9, 0))]));
    remote.push_lost_found(Reply::Rejected(500));
    let h = harness(remote);

    assert!(h.connectivity.refresh_all().await.unwrap());
    assert!(h.connectivity.is_online());
}

#[tokio::test]
async fn test_refresh_all_offline_when_both_fail() {
    let remote = FakeRemote::new();
    remote.push_events(Reply::Rejected(500));
    remote.push_lost_found(Reply::Rejected(500));
    let h = harness(remote);

    assert!(!h.connectivity.refresh_all().await.unwrap());
    assert!(!h.connectivity.is_online());
}

#[tokio::test]
async fn test_end_to_end_with_http_server() {
    let server = MockServer::start_async().await;
    let tomorrow = Utc::now() + Duration::days(1);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/events/upcoming");
            then.status(200).json_body(json!({
                "success": true,
                "count": 2,
                "data": [
                    {
                        "id": 11,
                        "title": "Hackathon Kickoff",
                        "category": "Technology",
                        "location": "Engineering Hall",
                        "start_time": (tomorrow + Duration::hours(2)).to_rfc3339(),
                        "source": "email"
                    },
                    {
                        "id": 10,
                        "title": "Info Session",
                        "category": "Career",
                        "location": "Student Union",
                        "start_time": tomorrow.to_rfc3339(),
                        "source": "website"
                    }
                ]
            }));
        })
        .await;

    let (db, _dir) = common::create_test_db();
    let client = ApiClient::new(&ServerConfig {
        base_url: server.url("/api"),
        ..ServerConfig::default()
    })
    .unwrap();
    let bus = common::create_test_event_bus();
    let sync = Arc::new(SyncService::new(
        common::create_test_config_handle(),
        db.clone(),
        Arc::new(client),
        bus.clone(),
    ));
    let connectivity = ConnectivityService::new(db, sync, bus);

    let events = connectivity.load_events(&EventView::upcoming(10)).await.unwrap();
    let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Info Session", "Hackathon Kickoff"]);
    assert!(events.iter().all(|e| e.source == EventSource::Api));
    assert!(connectivity.is_online());
}
