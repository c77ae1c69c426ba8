//! Shared helpers for resource tests.

#![allow(dead_code)]

use crmsync_client::{ApiClient, ClientConfig, CredentialStore, LogRedirect};
use crmsync_query::{Query, QueryClient, QueryConfig, QueryState, RetryPolicy};
use crmsync_resources::Crm;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// SDK pointed at `server` with a signed-in credential and no read retries.
pub async fn mock_crm(server: &MockServer) -> Crm {
    init_tracing();
    let config = ClientConfig {
        api_base_url: server.uri(),
        survey_url: "https://surveys.example.com/s/onboarding".to_string(),
        request_timeout_secs: 2,
        ..Default::default()
    };
    let credentials = CredentialStore::new();
    credentials.set("backend-token").await;
    let api = ApiClient::with_parts(config, credentials, Arc::new(LogRedirect)).expect("valid config");
    let queries = QueryClient::new(QueryConfig {
        retry: RetryPolicy::no_retry(),
        ..QueryConfig::default()
    });
    Crm::new(api, queries)
}

/// Number of requests the server saw for `method path`.
pub async fn hits(server: &MockServer, method: &str, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method && r.url.path() == path)
        .count()
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

pub fn account(id: &str, name: &str, tier: &str) -> Value {
    json!({"id": id, "name": name, "tier": tier})
}

pub fn contact(id: &str, account_id: &str) -> Value {
    json!({"id": id, "account_id": account_id, "first_name": "Ada", "last_name": "Lovelace"})
}

pub fn note(id: &str, account_id: &str) -> Value {
    json!({"id": id, "account_id": account_id, "body": "Call back Tuesday"})
}

pub fn page(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({"items": items, "total": total, "skip": 0, "limit": 20})
}
