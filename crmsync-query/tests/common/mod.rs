//! Shared helpers for cache tests.

#![allow(dead_code)]

use crmsync_client::ApiResult;
use crmsync_query::{Query, QueryClient, QueryConfig, QueryState, RetryPolicy};
use futures::future::{Ready, ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Cache that gives up after one attempt.
pub fn single_attempt_client() -> QueryClient {
    init_tracing();
    QueryClient::new(QueryConfig {
        retry: RetryPolicy::no_retry(),
        ..QueryConfig::default()
    })
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Fetcher returning the 1-based number of the call.
pub fn counting(calls: Arc<AtomicUsize>) -> impl Fn() -> Ready<ApiResult<usize>> + Send + Sync + 'static {
    move || ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Waits until the query's state satisfies `done`.
pub async fn wait_for<T, P>(query: &mut Query<T>, mut done: P) -> QueryState<T>
where
    T: Send + Sync + 'static,
    P: FnMut(&QueryState<T>) -> bool,
{
    let waiting = async {
        loop {
            let state = query.state();
            if done(&state) {
                return state;
            }
            if query.changed().await.is_none() {
                panic!("query stopped receiving updates");
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .expect("timed out waiting for query state")
}

/// Lets spawned tasks run until they block.
pub async fn settle_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
