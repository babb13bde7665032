//! Sync engine: full-replace mirroring of the remote collections.
//!
//! One run per collection:
//! 1. Fetch the full remote set (bounded by the configured limit), retrying
//!    `RemoteUnavailable` failures with exponential backoff.
//! 2. In a single local transaction, delete the mirrored subset and insert
//!    every fetched row. Overdue lost & found postings are re-expired in the
//!    same transaction.
//!
//! A failed fetch leaves the store untouched. A failed write rolls back to
//! the pre-sync state. Runs on the same collection are serialized.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use cc_core::config::{ConfigHandle, SyncConfig};
use cc_core::error::{CcError, CcResult};
use cc_models::{Database, Event, LostFoundItem};

use crate::event_bus::{AppEvent, EventBus};
use crate::remote::RemoteSource;
use crate::service::{Service, ServiceState};

/// A mirrored remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Events,
    LostFound,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Events, Collection::LostFound];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::LostFound => "lost_found",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a committed sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub collection: Collection,
    /// Mirrored rows deleted before the insert.
    pub removed: usize,
    /// Rows inserted from the remote set.
    pub inserted: usize,
    /// Mirrored postings already past expiry, stored as expired.
    pub expired: usize,
    /// Fetch attempts made, including the successful one.
    pub attempts: u32,
    pub duration_ms: u64,
}

enum Fetched {
    Events(Vec<Event>),
    LostFound(Vec<LostFoundItem>),
}

impl Fetched {
    fn len(&self) -> usize {
        match self {
            Self::Events(rows) => rows.len(),
            Self::LostFound(rows) => rows.len(),
        }
    }
}

/// Service that mirrors remote collections into the Local Store.
pub struct SyncService {
    state: ServiceState,
    config: ConfigHandle,
    database: Database,
    remote: Arc<dyn RemoteSource>,
    event_bus: EventBus,
    events_lock: Mutex<()>,
    lost_found_lock: Mutex<()>,
}

impl SyncService {
    /// Create a new SyncService.
    pub fn new(
        config: ConfigHandle,
        database: Database,
        remote: Arc<dyn RemoteSource>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: ServiceState::Created,
            config,
            database,
            remote,
            event_bus,
            events_lock: Mutex::new(()),
            lost_found_lock: Mutex::new(()),
        }
    }

    fn lock_for(&self, collection: Collection) -> &Mutex<()> {
        match collection {
            Collection::Events => &self.events_lock,
            Collection::LostFound => &self.lost_found_lock,
        }
    }

    /// Run one sync of `collection`.
    pub async fn sync(&self, collection: Collection) -> CcResult<SyncReport> {
        self.run(collection, None).await
    }

    /// Run one sync of `collection` that stops if `cancel` turns true while
    /// the run is still fetching. Once the write phase begins the run always
    /// completes.
    pub async fn sync_cancellable(
        &self,
        collection: Collection,
        cancel: watch::Receiver<bool>,
    ) -> CcResult<SyncReport> {
        self.run(collection, Some(cancel)).await
    }

    /// Sync both collections concurrently. Each result stands on its own.
    pub async fn sync_all(&self) -> Vec<(Collection, CcResult<SyncReport>)> {
        let (events, lost_found) = tokio::join!(
            self.sync(Collection::Events),
            self.sync(Collection::LostFound)
        );
        vec![
            (Collection::Events, events),
            (Collection::LostFound, lost_found),
        ]
    }

    async fn run(
        &self,
        collection: Collection,
        cancel: Option<watch::Receiver<bool>>,
    ) -> CcResult<SyncReport> {
        let _guard = self.lock_for(collection).lock().await;

        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("sync", collection = %collection, run_id = %run_id);

        async {
            let started = Instant::now();
            self.event_bus.emit(AppEvent::SyncStarted {
                collection,
                run_id: run_id.clone(),
            });

            let settings = self.config.read().await.sync.clone();

            let fetch = self.fetch_with_retry(collection, &settings);
            let fetched = match cancel {
                Some(mut cancel) => {
                    tokio::select! {
                        result = fetch => result,
                        _ = cancelled(&mut cancel) => {
                            Err(CcError::Cancelled(format!("{collection} sync cancelled during fetch")))
                        }
                    }
                }
                None => fetch.await,
            };

            let (fetched, attempts) = match fetched {
                Ok(ok) => ok,
                Err(e) => {
                    warn!("sync fetch failed, store untouched: {e}");
                    self.emit_failed(collection, &run_id, &e);
                    return Err(e);
                }
            };
            debug!("fetched {} rows in {attempts} attempt(s)", fetched.len());

            // Write phase: no await points from here on.
            let written = self.database.transaction(|conn| match &fetched {
                Fetched::Events(rows) => {
                    let (removed, inserted) = Event::replace_api_rows(conn, rows)?;
                    Ok((removed, inserted, Vec::new()))
                }
                Fetched::LostFound(rows) => {
                    let (removed, inserted) = LostFoundItem::replace_all(conn, rows)?;
                    // The server keeps listing overdue postings as active.
                    let expired = LostFoundItem::expire_overdue(conn, Utc::now())?;
                    Ok((removed, inserted, expired))
                }
            });
            let (removed, inserted, expired) = match written {
                Ok(counts) => counts,
                Err(e) => {
                    warn!("sync write failed, rolled back: {e}");
                    self.emit_failed(collection, &run_id, &e);
                    return Err(e);
                }
            };

            let report = SyncReport {
                run_id: run_id.clone(),
                collection,
                removed,
                inserted,
                expired: expired.len(),
                attempts,
                duration_ms: started.elapsed().as_millis() as u64,
            };
            info!(
                "sync complete: removed {removed}, inserted {inserted} in {}ms",
                report.duration_ms
            );
            self.event_bus.emit(AppEvent::SyncComplete {
                collection,
                run_id: run_id.clone(),
                removed,
                inserted,
            });
            if !expired.is_empty() {
                debug!("expired {} overdue posting(s) after mirroring", expired.len());
                self.event_bus.emit(AppEvent::LostFoundExpired { ids: expired });
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Fetch the full set, retrying only `RemoteUnavailable`.
    async fn fetch_with_retry(
        &self,
        collection: Collection,
        settings: &SyncConfig,
    ) -> CcResult<(Fetched, u32)> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once(collection, settings).await {
                Ok(fetched) => return Ok((fetched, attempt + 1)),
                Err(e) if e.is_retryable() && attempt < settings.max_retries => {
                    let delay = settings.retry_delay(attempt);
                    attempt += 1;
                    warn!(
                        "fetch attempt {attempt}/{} failed: {e}; retrying in {:.1}s",
                        settings.max_retries + 1,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, collection: Collection, settings: &SyncConfig) -> CcResult<Fetched> {
        match collection {
            Collection::Events => {
                let limit = settings.events_limit;
                let mut rows = self.remote.fetch_events(limit).await?;
                rows.truncate(limit as usize);
                Ok(Fetched::Events(rows))
            }
            Collection::LostFound => {
                let limit = settings.lost_found_limit;
                let mut rows = self.remote.fetch_lost_found(limit).await?;
                rows.truncate(limit as usize);
                Ok(Fetched::LostFound(rows))
            }
        }
    }

    fn emit_failed(&self, collection: Collection, run_id: &str, error: &CcError) {
        self.event_bus.emit(AppEvent::SyncFailed {
            collection,
            run_id: run_id.to_string(),
            error: error.to_string(),
            remote: error.is_remote(),
        });
    }
}

/// Resolves once the cancel flag is set. Never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl Service for SyncService {
    fn name(&self) -> &str {
        "sync"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn init(&mut self) -> CcResult<()> {
        self.state = ServiceState::Running;
        info!("sync service initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> CcResult<()> {
        self.state = ServiceState::Stopped;
        info!("sync service stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Events.to_string(), "events");
        assert_eq!(Collection::LostFound.as_str(), "lost_found");
        assert_eq!(Collection::ALL.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_ignores_dropped_sender() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            cancelled(&mut rx),
        )
        .await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_on_flag() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_millis(50), cancelled(&mut rx))
            .await
            .unwrap();
    }
}
