//! Connectivity fallback controller.
//!
//! Every load tries a sync first and then reads the requested view from the
//! Local Store, whether or not the sync succeeded. Remote failures only flip
//! the online flag. Local failures propagate.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use cc_core::error::CcResult;
use cc_models::{Database, Event, LostFoundFilter, LostFoundItem};

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};
use crate::sync::{Collection, SyncService};

/// A local view of the events table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventView {
    /// Events starting on a calendar day.
    Today(NaiveDate),
    /// Events starting at or after `from`, at most `limit`.
    Upcoming { from: DateTime<Utc>, limit: u32 },
    /// Events starting in `[start, end)`.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Upcoming events in one category.
    Category { name: String, from: DateTime<Utc> },
}

impl EventView {
    /// Today's events in UTC.
    pub fn today() -> Self {
        Self::Today(Utc::now().date_naive())
    }

    pub fn upcoming(limit: u32) -> Self {
        Self::Upcoming {
            from: Utc::now(),
            limit,
        }
    }

    fn read(&self, database: &Database) -> CcResult<Vec<Event>> {
        let conn = database.conn()?;
        match self {
            Self::Today(day) => Event::today(&conn, *day),
            Self::Upcoming { from, limit } => Event::upcoming(&conn, *from, *limit),
            Self::Range { start, end } => Event::in_range(&conn, *start, *end),
            Self::Category { name, from } => Event::by_category(&conn, name, *from),
        }
    }
}

/// Loads collections with a sync-then-read-local policy and tracks whether
/// the remote API was reachable on the last attempt.
pub struct ConnectivityService {
    state: ServiceState,
    database: Database,
    sync: Arc<SyncService>,
    event_bus: EventBus,
    online: watch::Sender<bool>,
}

impl ConnectivityService {
    /// Create a new controller. The online flag starts `true` and is
    /// corrected by the first load.
    pub fn new(database: Database, sync: Arc<SyncService>, event_bus: EventBus) -> Self {
        let (online, _) = watch::channel(true);
        Self {
            state: ServiceState::Created,
            database,
            sync,
            event_bus,
            online,
        }
    }

    /// Whether the last sync attempt reached the remote API.
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Watch the online flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Sync, then read an events view from the store.
    pub async fn load_events(&self, view: &EventView) -> CcResult<Vec<Event>> {
        self.refresh(Collection::Events).await?;
        view.read(&self.database)
    }

    /// Sync, expire overdue postings locally, then read active postings.
    pub async fn load_lost_found(&self, filter: &LostFoundFilter) -> CcResult<Vec<LostFoundItem>> {
        self.refresh(Collection::LostFound).await?;

        let conn = self.database.conn()?;
        let expired = LostFoundItem::expire_overdue(&conn, Utc::now())?;
        if !expired.is_empty() {
            info!("expired {} overdue lost & found posting(s) locally", expired.len());
            self.event_bus.emit(AppEvent::LostFoundExpired { ids: expired });
        }
        LostFoundItem::active(&conn, filter)
    }

    /// Attempt a sync of `collection` and update the online flag.
    ///
    /// Returns the new online state. Remote failures are absorbed; local
    /// failures are returned.
    pub async fn refresh(&self, collection: Collection) -> CcResult<bool> {
        match self.sync.sync(collection).await {
            Ok(_) => {
                self.set_online(true);
                Ok(true)
            }
            Err(e) if e.is_remote() => {
                warn!("{collection} unavailable, serving cached data: {e}");
                self.set_online(false);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Sync both collections. Online if either reached the remote API.
    pub async fn refresh_all(&self) -> CcResult<bool> {
        let mut online = false;
        for (collection, result) in self.sync.sync_all().await {
            match result {
                Ok(_) => online = true,
                Err(e) if e.is_remote() => {
                    warn!("{collection} unavailable during refresh: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        self.set_online(online);
        Ok(online)
    }

    fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!("connectivity changed: {}", if online { "online" } else { "offline" });
            self.event_bus.emit(AppEvent::ConnectivityChanged { online });
        }
    }
}

impl Service for ConnectivityService {
    fn name(&self) -> &str {
        "connectivity"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn init(&mut self) -> CcResult<()> {
        self.state = ServiceState::Running;
        Ok(())
    }

    fn shutdown(&mut self) -> CcResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}
