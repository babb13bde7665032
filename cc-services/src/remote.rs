//! The remote side of a sync, as seen by the engine.

use async_trait::async_trait;

use cc_api::{ApiClient, EventScope};
use cc_core::error::CcResult;
use cc_models::{Event, LostFoundFilter, LostFoundItem};

/// Source of the full remote collections.
///
/// The production implementation is [`ApiClient`]; tests substitute a fake.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Upcoming events, ascending by start time, at most `limit`.
    async fn fetch_events(&self, limit: u32) -> CcResult<Vec<Event>>;

    /// Active lost & found postings, newest first, at most `limit`.
    async fn fetch_lost_found(&self, limit: u32) -> CcResult<Vec<LostFoundItem>>;
}

#[async_trait]
impl RemoteSource for ApiClient {
    async fn fetch_events(&self, limit: u32) -> CcResult<Vec<Event>> {
        self.get_events(&EventScope::Upcoming { limit }).await
    }

    async fn fetch_lost_found(&self, limit: u32) -> CcResult<Vec<LostFoundItem>> {
        let filter = LostFoundFilter {
            limit: Some(limit),
            ..Default::default()
        };
        self.get_lost_found_items(&filter).await
    }
}
