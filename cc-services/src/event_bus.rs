//! Typed event bus for intra-service communication.
//!
//! Uses tokio broadcast channels so the sync engine and the connectivity
//! controller can report progress without knowing who is listening.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::sync::Collection;

/// Application-level events published by the services.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A sync run acquired its collection lock and started fetching.
    SyncStarted {
        collection: Collection,
        run_id: String,
    },
    /// A sync run committed.
    SyncComplete {
        collection: Collection,
        run_id: String,
        removed: usize,
        inserted: usize,
    },
    /// A sync run ended without touching the store.
    SyncFailed {
        collection: Collection,
        run_id: String,
        error: String,
        /// Whether the failure came from the remote side.
        remote: bool,
    },
    /// The online flag flipped.
    ConnectivityChanged {
        online: bool,
    },
    /// A local cleanup pass marked postings as expired.
    LostFoundExpired {
        ids: Vec<i64>,
    },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Every subscriber gets every event. Slow subscribers that fall behind
/// receive a `Lagged` error and miss events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::SyncStarted { .. } => "SyncStarted",
        AppEvent::SyncComplete { .. } => "SyncComplete",
        AppEvent::SyncFailed { .. } => "SyncFailed",
        AppEvent::ConnectivityChanged { .. } => "ConnectivityChanged",
        AppEvent::LostFoundExpired { .. } => "LostFoundExpired",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(AppEvent::ConnectivityChanged { online: false });

        match rx.recv().await.unwrap() {
            AppEvent::ConnectivityChanged { online } => assert!(!online),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(AppEvent::SyncComplete {
            collection: Collection::Events,
            run_id: "run-1".into(),
            removed: 3,
            inserted: 4,
        });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                AppEvent::SyncComplete { inserted, .. } => assert_eq!(inserted, 4),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(AppEvent::LostFoundExpired { ids: vec![1, 2] });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_labels() {
        assert_eq!(
            event_label(&AppEvent::ConnectivityChanged { online: true }),
            "ConnectivityChanged"
        );
        assert_eq!(
            event_label(&AppEvent::SyncFailed {
                collection: Collection::LostFound,
                run_id: String::new(),
                error: String::new(),
                remote: true,
            }),
            "SyncFailed"
        );
    }
}
