//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use cc_core::config::{AppConfig, ConfigHandle, DatabaseConfig};
use cc_core::error::{CcError, CcResult};
use cc_models::{Database, Event, LostFoundItem, LostFoundKind, LostFoundStatus};
use cc_services::{ConnectivityService, EventBus, RemoteSource, SyncService};

/// Create a temporary database with full schema and migrations applied.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let config = DatabaseConfig::default();
    let db = Database::init(&path, &config).expect("failed to init test database");
    (db, dir)
}

/// Default configuration with retries short enough for tests.
pub fn create_test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.retry_base_delay_ms = 5;
    config.sync.retry_max_delay_ms = 20;
    config
}

/// Create a ConfigHandle wrapping the test config.
pub fn create_test_config_handle() -> ConfigHandle {
    ConfigHandle::new(create_test_config())
}

/// Create an EventBus with a small buffer suitable for tests.
pub fn create_test_event_bus() -> EventBus {
    EventBus::new(64)
}

/// 2025-09-15 at `h:m` UTC.
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, h, m, 0).unwrap()
}

/// A remote event as the client would hand it over.
pub fn remote_event(id: i64, title: &str, start: DateTime<Utc>) -> Event {
    Event::from_server_map(&serde_json::json!({
        "id": id,
        "title": title,
        "category": "Academic",
        "location": "Room 2035",
        "start_time": start.to_rfc3339(),
        "source": "email",
        "created_at": "2025-09-01T00:00:00Z",
    }))
    .expect("valid remote event")
}

/// An active lost & found posting that expires far in the future.
pub fn remote_item(id: i64, kind: LostFoundKind, name: &str, created: DateTime<Utc>) -> LostFoundItem {
    LostFoundItem {
        id,
        kind,
        item_name: name.to_string(),
        description: Some(String::new()),
        category: Some("Other".into()),
        location_lost: Some("Library".into()),
        image_path: None,
        contact_info: Some("andrew@example.edu".into()),
        status: LostFoundStatus::Active,
        created_at: created,
        expires_at: Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()),
    }
}

/// One scripted reply from the fake remote.
pub enum Reply<T> {
    Rows(Vec<T>),
    Unavailable,
    Rejected(u16),
}

impl<T: Clone> Reply<T> {
    fn resolve(&self) -> CcResult<Vec<T>> {
        match self {
            Reply::Rows(rows) => Ok(rows.clone()),
            Reply::Unavailable => Err(CcError::RemoteUnavailable("connection refused".into())),
            Reply::Rejected(status) => Err(CcError::RemoteRejected {
                status: *status,
                message: "Failed to fetch".into(),
            }),
        }
    }
}

/// In-memory remote. Each fetch pops the next scripted reply; the last reply
/// repeats once the script runs out.
pub struct FakeRemote {
    events: Mutex<VecDeque<Reply<Event>>>,
    lost_found: Mutex<VecDeque<Reply<LostFoundItem>>>,
    pub event_calls: AtomicUsize,
    pub lost_found_calls: AtomicUsize,
    /// Delay before every fetch returns.
    pub latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            lost_found: Mutex::new(VecDeque::new()),
            event_calls: AtomicUsize::new(0),
            lost_found_calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_events(&self, reply: Reply<Event>) {
        self.events.lock().unwrap().push_back(reply);
    }

    pub fn push_lost_found(&self, reply: Reply<LostFoundItem>) {
        self.lost_found.lock().unwrap().push_back(reply);
    }

    pub fn event_calls(&self) -> usize {
        self.event_calls.load(Ordering::SeqCst)
    }

    /// Most fetches that were ever running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<Reply<T>>>) -> CcResult<Vec<T>> {
        let mut queue = queue.lock().unwrap();
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            None
        };
        match reply {
            Some(reply) => reply.resolve(),
            None => queue
                .front()
                .map(Reply::resolve)
                .unwrap_or_else(|| Ok(Vec::new())),
        }
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    // Ignores `limit` so the engine's own bound is what gets tested.
    async fn fetch_events(&self, _limit: u32) -> CcResult<Vec<Event>> {
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        Self::next(&self.events)
    }

    async fn fetch_lost_found(&self, _limit: u32) -> CcResult<Vec<LostFoundItem>> {
        self.lost_found_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        Self::next(&self.lost_found)
    }
}

/// Everything a sync or fallback test needs, wired together.
pub struct Harness {
    pub db: Database,
    pub remote: Arc<FakeRemote>,
    pub bus: EventBus,
    pub sync: Arc<SyncService>,
    pub connectivity: ConnectivityService,
    _dir: TempDir,
}

pub fn harness(remote: FakeRemote) -> Harness {
    let (db, dir) = create_test_db();
    let remote = Arc::new(remote);
    let bus = create_test_event_bus();
    let sync = Arc::new(SyncService::new(
        create_test_config_handle(),
        db.clone(),
        remote.clone(),
        bus.clone(),
    ));
    let connectivity = ConnectivityService::new(db.clone(), sync.clone(), bus.clone());
    Harness {
        db,
        remote,
        bus,
        sync,
        connectivity,
        _dir: dir,
    }
}
