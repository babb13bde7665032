//! Campus Companion Services - sync engine and connectivity fallback.
//!
//! This crate provides:
//! - The service lifecycle trait
//! - The `RemoteSource` seam between the engine and the HTTP client
//! - The sync engine (full-replace mirroring, single flight per collection,
//!   retry with backoff, fetch-phase cancellation)
//! - The connectivity controller (sync, then always read the local view)
//! - The event bus both report through

pub mod service;
pub mod event_bus;
pub mod remote;
pub mod sync;
pub mod connectivity;

// Re-export key types
pub use service::{Service, ServiceState, ServiceStatus};
pub use event_bus::{AppEvent, EventBus};
pub use remote::RemoteSource;
pub use sync::{Collection, SyncReport, SyncService};
pub use connectivity::{ConnectivityService, EventView};
