use crate::cache::QueryClient;
use crate::invalidation::Invalidation;
use crmsync_client::{ApiError, ApiResult};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// Progress of the latest call to [`Mutation::mutate`].
#[derive(Debug, Clone)]
pub struct MutationRecord<V, R> {
    pub status: MutationStatus,
    pub variables: Option<V>,
    pub result: Option<R>,
    pub error: Option<ApiError>,
}

impl<V, R> Default for MutationRecord<V, R> {
    fn default() -> Self {
        Self {
            status: MutationStatus::Idle,
            variables: None,
            result: None,
            error: None,
        }
    }
}

impl<V, R> MutationRecord<V, R> {
    pub fn is_pending(&self) -> bool {
        self.status == MutationStatus::Pending
    }

    pub fn is_validation_error(&self) -> bool {
        self.error.as_ref().is_some_and(ApiError::is_validation)
    }
}

type Run<V, R> = Arc<dyn Fn(V) -> BoxFuture<'static, ApiResult<R>> + Send + Sync>;
type Invalidates<V, R> = Arc<dyn Fn(&V, &R) -> Vec<Invalidation> + Send + Sync>;

/// A write against the backend with a declared invalidation set.
///
/// Mutations are never retried. On success every item of the invalidation
/// set computed from the variables and the result is applied to the cache;
/// on failure the cache is left untouched.
pub struct Mutation<V, R> {
    client: QueryClient,
    name: &'static str,
    run: Run<V, R>,
    invalidates: Invalidates<V, R>,
    record: watch::Sender<MutationRecord<V, R>>,
}

impl<V, R> fmt::Debug for Mutation<V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<V, R> Mutation<V, R>
where
    V: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut, I>(client: &QueryClient, name: &'static str, run: F, invalidates: I) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<R>> + Send + 'static,
        I: Fn(&V, &R) -> Vec<Invalidation> + Send + Sync + 'static,
    {
        let (record, _) = watch::channel(MutationRecord::default());
        Self {
            client: client.clone(),
            name,
            run: Arc::new(move |variables: V| run(variables).boxed()),
            invalidates: Arc::new(invalidates),
            record,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn mutate(&self, variables: V) -> ApiResult<R> {
        self.record.send_replace(MutationRecord {
            status: MutationStatus::Pending,
            variables: Some(variables.clone()),
            result: None,
            error: None,
        });

        match (self.run)(variables.clone()).await {
            Ok(result) => {
                let targets = (self.invalidates)(&variables, &result);
                for target in &targets {
                    self.client.invalidate(target);
                }
                debug!(mutation = self.name, invalidated = targets.len(), "mutation succeeded");
                self.record.send_replace(MutationRecord {
                    status: MutationStatus::Success,
                    variables: Some(variables),
                    result: Some(result.clone()),
                    error: None,
                });
                Ok(result)
            }
            Err(err) => {
                warn!(mutation = self.name, error = %err, "mutation failed");
                self.record.send_replace(MutationRecord {
                    status: MutationStatus::Error,
                    variables: Some(variables),
                    result: None,
                    error: Some(err.clone()),
                });
                Err(err)
            }
        }
    }

    /// The invalidation set a successful call with these inputs applies.
    pub fn invalidations_for(&self, variables: &V, result: &R) -> Vec<Invalidation> {
        (self.invalidates)(variables, result)
    }

    pub fn record(&self) -> MutationRecord<V, R> {
        self.record.borrow().clone()
    }

    /// Watches the record for changes.
    pub fn subscribe(&self) -> watch::Receiver<MutationRecord<V, R>> {
        self.record.subscribe()
    }

    /// Returns the record to idle.
    pub fn reset(&self) {
        self.record.send_replace(MutationRecord::default());
    }
}
