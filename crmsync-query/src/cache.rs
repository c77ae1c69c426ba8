//! The process-wide query cache.
//!
//! Entries live in a `HashMap` behind a `std::sync::Mutex` that is only ever
//! held for short synchronous sections. Every fetch carries a tag and may
//! commit only while its entry still carries that tag.

use crate::config::QueryConfig;
use crate::entry::{CacheEntry, Fetcher, Payload, QueryStatus};
use crate::invalidation::Invalidation;
use crate::key::QueryKey;
use crate::query::QueryState;
use crate::retry::with_retry;
use crmsync_client::ApiResult;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub(crate) enum FetchPlan {
    /// Cached data is fresh.
    Fresh,
    /// Another fetch for the key is in flight.
    Join,
    /// A new fetch with this tag must run.
    Start(u64),
}

struct Shared {
    config: QueryConfig,
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    next_tag: AtomicU64,
}

/// Shared handle to the query cache. Cloning is cheap.
#[derive(Clone)]
pub struct QueryClient {
    shared: Arc<Shared>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("config", &self.shared.config)
            .field("entries", &self.lock().len())
            .finish()
    }
}

impl QueryClient {
    pub fn new(config: QueryConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                entries: Mutex::new(HashMap::new()),
                next_tag: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn next_tag(&self) -> u64 {
        self.shared.next_tag.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns true if an entry exists for `key`.
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Keys currently cached, sorted.
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    // ── Observers ───────────────────────────────────────────────

    pub(crate) fn observe(
        &self,
        key: &QueryKey,
        fetcher: Fetcher,
        stale_time: Duration,
    ) -> watch::Receiver<u64> {
        let mut entries = self.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(stale_time));
        entry.observers += 1;
        entry.fetcher = Some(fetcher);
        entry.stale_time = stale_time;
        entry.subscribe()
    }

    /// Releases one observer. The last observer leaving cancels any fetch in
    /// flight for the key.
    pub(crate) fn unobserve(&self, key: &QueryKey) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        entry.observers = entry.observers.saturating_sub(1);
        if entry.observers == 0 {
            entry.fetcher = None;
            if entry.fetch_tag.take().is_some() {
                debug!(key = %key, "last observer left, cancelling fetch");
                entry.bump();
            }
        }
    }

    pub(crate) fn set_stale_time(&self, key: &QueryKey, stale_time: Duration) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.stale_time = stale_time;
        }
    }

    /// Number of live observers of `key`.
    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.lock().get(key).map_or(0, |e| e.observers)
    }

    // ── Fetching ────────────────────────────────────────────────

    pub(crate) fn plan_fetch(
        &self,
        key: &QueryKey,
        fetcher: &Fetcher,
        stale_time: Duration,
        force: bool,
    ) -> FetchPlan {
        let mut entries = self.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(stale_time));
        if entry.fetcher.is_none() {
            entry.fetcher = Some(fetcher.clone());
        }
        if entry.is_fetching() {
            return FetchPlan::Join;
        }
        if !force && entry.data.is_some() && !entry.is_stale(stale_time) {
            return FetchPlan::Fresh;
        }
        let tag = self.next_tag();
        entry.fetch_tag = Some(tag);
        entry.bump();
        FetchPlan::Start(tag)
    }

    /// Brings `key` up to date and waits until no fetch is in flight.
    pub(crate) async fn ensure(
        &self,
        key: &QueryKey,
        fetcher: &Fetcher,
        stale_time: Duration,
        force: bool,
    ) {
        match self.plan_fetch(key, fetcher, stale_time, force) {
            FetchPlan::Fresh => return,
            FetchPlan::Join => {}
            // spawned so that dropping the caller never strands the tag
            FetchPlan::Start(tag) => self.spawn_fetch(key.clone(), tag, fetcher.clone()),
        }
        self.wait_for_settle(key).await;
    }

    /// Starts a background fetch when the entry is absent or stale.
    pub(crate) fn revalidate(&self, key: &QueryKey, fetcher: &Fetcher, stale_time: Duration) {
        if let FetchPlan::Start(tag) = self.plan_fetch(key, fetcher, stale_time, false) {
            self.spawn_fetch(key.clone(), tag, fetcher.clone());
        }
    }

    fn spawn_fetch(&self, key: QueryKey, tag: u64, fetcher: Fetcher) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(key = %key, "no async runtime, background fetch skipped");
            self.abandon(&key, tag);
            return;
        };
        let client = self.clone();
        runtime.spawn(async move {
            client.run_fetch(key, tag, fetcher).await;
        });
    }

    fn abandon(&self, key: &QueryKey, tag: u64) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key)
            && entry.fetch_tag == Some(tag)
        {
            entry.fetch_tag = None;
            entry.bump();
        }
    }

    async fn run_fetch(&self, key: QueryKey, tag: u64, fetcher: Fetcher) {
        debug!(key = %key, tag, "fetching");
        let result = with_retry(&self.shared.config.retry, || (*fetcher)()).await;
        self.commit(&key, tag, result);
    }

    fn commit(&self, key: &QueryKey, tag: u64, result: ApiResult<Payload>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, tag, "entry removed, discarding response");
            return;
        };
        if entry.fetch_tag != Some(tag) {
            debug!(key = %key, tag, "discarding superseded response");
            return;
        }
        entry.fetch_tag = None;
        match result {
            Ok(data) => {
                entry.data = Some(data);
                entry.data_updated_at = Some(Instant::now());
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.invalidated = false;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "query failed");
                entry.error = Some(err);
                entry.status = QueryStatus::Error;
            }
        }
        entry.bump();
    }

    async fn wait_for_settle(&self, key: &QueryKey) {
        let Some(mut version) = self.lock().get(key).map(CacheEntry::subscribe) else {
            return;
        };
        loop {
            let fetching = {
                let entries = self.lock();
                entries.get(key).is_some_and(CacheEntry::is_fetching)
            };
            if !fetching || version.changed().await.is_err() {
                return;
            }
        }
    }

    // ── Reads ───────────────────────────────────────────────────

    pub(crate) fn snapshot<T: Send + Sync + 'static>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
    ) -> QueryState<T> {
        let entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return QueryState::pending(true);
        };
        let data = entry.data.as_ref().and_then(|payload| downcast::<T>(key, payload));
        QueryState {
            is_loading: data.is_none() && entry.is_fetching(),
            data,
            error: entry.error.clone(),
            status: entry.status,
            is_enabled: true,
            is_fetching: entry.is_fetching(),
            is_stale: entry.is_stale(stale_time),
            data_updated_at: entry.data_updated_at,
        }
    }

    /// Current state of `key` under the stale time its observers declared.
    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let stale_time = self
            .lock()
            .get(key)
            .map_or(self.shared.config.stale_time, |e| e.stale_time);
        self.snapshot(key, stale_time)
    }

    /// Cached data of `key`, if any and of type `T`.
    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entries = self.lock();
        let payload = entries.get(key)?.data.as_ref()?;
        downcast::<T>(key, payload)
    }

    /// Writes data for `key` as if it had just been fetched.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
        let stale_time = self.shared.config.stale_time;
        let mut entries = self.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(stale_time));
        entry.data = Some(Arc::new(data) as Payload);
        entry.data_updated_at = Some(Instant::now());
        entry.error = None;
        entry.status = QueryStatus::Success;
        entry.invalidated = false;
        entry.fetch_tag = None;
        entry.bump();
    }

    // ── Invalidation ────────────────────────────────────────────

    /// Marks every matching entry stale and refetches the observed ones in
    /// the background. Returns the number of entries matched.
    pub fn invalidate(&self, target: &Invalidation) -> usize {
        let matched = self.invalidate_where(|key| target.matches(key));
        debug!(target = %target, matched, "invalidated queries");
        matched
    }

    /// Marks every entry stale.
    pub fn invalidate_all(&self) -> usize {
        let matched = self.invalidate_where(|_| true);
        debug!(matched, "invalidated all queries");
        matched
    }

    fn invalidate_where(&self, mut matches: impl FnMut(&QueryKey) -> bool) -> usize {
        let mut refetch = Vec::new();
        let mut matched = 0;
        {
            let mut entries = self.lock();
            for (key, entry) in entries.iter_mut() {
                if !matches(key) {
                    continue;
                }
                matched += 1;
                entry.invalidated = true;
                let wanted = entry.observers > 0 || entry.is_fetching();
                match entry.fetcher.clone() {
                    Some(fetcher) if wanted => {
                        let tag = self.next_tag();
                        entry.fetch_tag = Some(tag);
                        refetch.push((key.clone(), tag, fetcher));
                    }
                    _ => entry.fetch_tag = None,
                }
                entry.bump();
            }
        }
        for (key, tag, fetcher) in refetch {
            self.spawn_fetch(key, tag, fetcher);
        }
        matched
    }

    /// Removes matching entries that have no observers.
    pub fn remove_queries(&self, target: &Invalidation) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, entry| entry.observers > 0 || !target.matches(key));
        before - entries.len()
    }

    /// Drops all cached data. Unobserved entries are removed; observed ones
    /// are reset to pending and any fetch in flight is discarded.
    pub fn clear(&self) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.observers > 0);
        for entry in entries.values_mut() {
            entry.reset();
        }
        info!(removed = before - entries.len(), kept = entries.len(), "query cache cleared");
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, payload: &Payload) -> Option<Arc<T>> {
    match Arc::clone(payload).downcast::<T>() {
        Ok(data) => Some(data),
        Err(_) => {
            warn!(
                key = %key,
                expected = std::any::type_name::<T>(),
                "cached data has a different type"
            );
            None
        }
    }
}
