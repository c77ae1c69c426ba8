use crmsync_client::{ApiError, ApiResult};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Type-erased query result held by the cache.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Type-erased fetch function registered by the observers of a key.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, ApiResult<Payload>> + Send + Sync>;

/// Lifecycle status of a cached read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// No data has been fetched yet.
    Pending,
    Success,
    /// The latest fetch failed. Earlier data, if any, is kept.
    Error,
}

pub(crate) struct CacheEntry {
    pub data: Option<Payload>,
    pub data_updated_at: Option<Instant>,
    pub error: Option<ApiError>,
    pub status: QueryStatus,
    pub invalidated: bool,
    pub stale_time: Duration,
    /// Tag of the fetch allowed to commit. `None` when idle.
    pub fetch_tag: Option<u64>,
    pub observers: usize,
    pub fetcher: Option<Fetcher>,
    version: watch::Sender<u64>,
}

impl CacheEntry {
    pub fn new(stale_time: Duration) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            data: None,
            data_updated_at: None,
            error: None,
            status: QueryStatus::Pending,
            invalidated: false,
            stale_time,
            fetch_tag: None,
            observers: 0,
            fetcher: None,
            version,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_tag.is_some()
    }

    /// Stale when invalidated, never fetched, or older than `stale_time`.
    pub fn is_stale(&self, stale_time: Duration) -> bool {
        if self.invalidated {
            return true;
        }
        match self.data_updated_at {
            Some(at) => at.elapsed() >= stale_time,
            None => true,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Notifies every observer that the entry changed.
    pub fn bump(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Drops data and error, keeping observers and their fetcher.
    pub fn reset(&mut self) {
        self.data = None;
        self.data_updated_at = None;
        self.error = None;
        self.status = QueryStatus::Pending;
        self.invalidated = false;
        self.fetch_tag = None;
        self.bump();
    }
}
