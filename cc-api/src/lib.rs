//! Campus Companion API - HTTP client for the campus REST API.
//!
//! Covers the two remote collections the app mirrors: calendar events
//! (read-only) and lost & found postings (full CRUD plus resolve and
//! cleanup). Transport failures surface as `RemoteUnavailable`, well-formed
//! server errors as `RemoteRejected` or `NotFound`. Retrying is left to the
//! caller.

pub mod client;
pub mod endpoints;
pub mod response;

// Re-export key types
pub use client::ApiClient;
pub use endpoints::events::EventScope;
pub use endpoints::lost_found::{LostFoundPatch, NewLostFoundItem};
pub use response::ApiResponse;
