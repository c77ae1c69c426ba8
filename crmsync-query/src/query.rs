use crate::cache::QueryClient;
use crate::entry::{Fetcher, Payload, QueryStatus};
use crate::key::QueryKey;
use crmsync_client::{ApiError, ApiResult};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Snapshot of one cached read as seen by an observer.
#[derive(Debug)]
pub struct QueryState<T> {
    /// Last successfully fetched data. Survives failed refetches.
    pub data: Option<Arc<T>>,
    /// Error of the latest fetch, cleared by the next success.
    pub error: Option<ApiError>,
    pub status: QueryStatus,
    pub is_enabled: bool,
    /// First load: no data yet and a fetch in flight.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_stale: bool,
    pub data_updated_at: Option<Instant>,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            status: self.status,
            is_enabled: self.is_enabled,
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
            data_updated_at: self.data_updated_at,
        }
    }
}

impl<T> QueryState<T> {
    pub(crate) fn pending(is_enabled: bool) -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            is_enabled,
            is_loading: false,
            is_fetching: false,
            is_stale: is_enabled,
            data_updated_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Outcome of the latest settled fetch.
    ///
    /// A failed fetch wins over older data; a fetch that settled without
    /// committing anything reports [`ApiError::Cancelled`].
    pub fn into_result(self) -> ApiResult<Arc<T>> {
        match (self.status, self.data, self.error) {
            (QueryStatus::Error, _, Some(err)) => Err(err),
            (_, Some(data), _) => Ok(data),
            (_, None, Some(err)) => Err(err),
            (_, None, None) => Err(ApiError::Cancelled),
        }
    }
}

/// An observer of one cached read.
///
/// While a `Query` is alive its key counts as observed: invalidating the key
/// refetches it in the background. A query built without a key is disabled
/// and never issues a request.
pub struct Query<T> {
    client: QueryClient,
    key: Option<QueryKey>,
    fetcher: Fetcher,
    stale_time: Duration,
    updates: Option<watch::Receiver<u64>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("stale_time", &self.stale_time)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Query<T> {
    pub fn new<F, Fut>(client: &QueryClient, key: Option<QueryKey>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || {
            let pending = fetch();
            async move { pending.await.map(|data| Arc::new(data) as Payload) }.boxed()
        });
        let stale_time = client.config().stale_time;
        let updates = key
            .as_ref()
            .map(|key| client.observe(key, fetcher.clone(), stale_time));
        Self {
            client: client.clone(),
            key,
            fetcher,
            stale_time,
            updates,
            _marker: PhantomData,
        }
    }

    /// A query that never fetches.
    pub fn disabled(client: &QueryClient) -> Self {
        Self::new(client, None, || async {
            Err::<T, _>(ApiError::MissingIdentifier("id"))
        })
    }

    /// Overrides how long fetched data counts as fresh for this observer.
    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        if let Some(key) = &self.key {
            self.client.set_stale_time(key, stale_time);
        }
        self
    }

    pub fn key(&self) -> Option<&QueryKey> {
        self.key.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Current state without triggering a fetch.
    pub fn state(&self) -> QueryState<T> {
        match &self.key {
            Some(key) => self.client.snapshot(key, self.stale_time),
            None => QueryState::pending(false),
        }
    }

    /// Serves fresh cached data, or fetches (joining a fetch already in
    /// flight) and returns the settled state.
    pub async fn fetch(&self) -> QueryState<T> {
        self.settle(false).await
    }

    /// Fetches regardless of freshness.
    pub async fn refetch(&self) -> QueryState<T> {
        self.settle(true).await
    }

    async fn settle(&self, force: bool) -> QueryState<T> {
        let Some(key) = &self.key else {
            return QueryState::pending(false);
        };
        self.client
            .ensure(key, &self.fetcher, self.stale_time, force)
            .await;
        self.client.snapshot(key, self.stale_time)
    }

    /// Stale-while-revalidate: returns the current state at once and starts
    /// a background fetch if the data is absent or stale.
    pub fn read(&self) -> QueryState<T> {
        if let Some(key) = &self.key {
            self.client.revalidate(key, &self.fetcher, self.stale_time);
        }
        self.state()
    }

    /// Waits for the next change of the key's entry. Returns `None` for a
    /// disabled query or once the entry has been removed.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        let updates = self.updates.as_mut()?;
        updates.changed().await.ok()?;
        Some(self.state())
    }

    /// Fetches if needed and returns the data or the error.
    pub async fn data(&self) -> ApiResult<Arc<T>> {
        if self.key.is_none() {
            return Err(ApiError::MissingIdentifier("id"));
        }
        self.fetch().await.into_result()
    }
}

impl<T> Drop for Query<T> {
    fn drop(&mut self) {
        if let Some(key) = &self.key {
            self.client.unobserve(key);
        }
    }
}

impl QueryClient {
    /// One-shot read of `key` through `fetch`, honoring the cache.
    pub async fn fetch_query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> ApiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        Query::new(self, Some(key), fetch).data().await
    }
}
