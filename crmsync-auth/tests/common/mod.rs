//! Shared helpers for auth bridge tests.

#![allow(dead_code)]

use async_trait::async_trait;
use crmsync_auth::{
    AuthBridge, AuthError, AuthEvent, AuthProvider, AuthResult, BackendExchange, ExternalSession,
    ExternalUser, SessionState,
};
use crmsync_client::{ApiClient, ApiError, ApiResult, ClientConfig, CredentialStore};
use crmsync_query::QueryClient;
use crmsync_types::BackendSession;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory auth provider.
pub struct FakeProvider {
    session: Mutex<Option<ExternalSession>>,
    events: broadcast::Sender<AuthEvent>,
    fail_reads: bool,
    pub sign_outs: AtomicUsize,
}

impl FakeProvider {
    pub fn new(session: Option<ExternalSession>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            session: Mutex::new(session),
            events,
            fail_reads: false,
            sign_outs: AtomicUsize::new(0),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            session: Mutex::new(None),
            events,
            fail_reads: true,
            sign_outs: AtomicUsize::new(0),
        })
    }

    pub fn emit(&self, event: AuthEvent) {
        self.events.send(event).expect("bridge is subscribed");
    }
}

#[async_trait]
impl AuthProvider for FakeProvider {
    async fn current_session(&self) -> AuthResult<Option<ExternalSession>> {
        if self.fail_reads {
            return Err(AuthError::Provider("provider offline".into()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        Ok(())
    }
}

pub fn session(access_token: &str) -> ExternalSession {
    ExternalSession {
        access_token: access_token.to_string(),
        user: ExternalUser {
            id: "ext-42".to_string(),
            email: Some("ada@example.com".to_string()),
        },
    }
}

pub fn backend_session(token: &str) -> Value {
    json!({
        "token": token,
        "user": {"id": "u1", "email": "ada@example.com", "organization_id": "o1"}
    })
}

pub fn api(server: &MockServer) -> ApiClient {
    init_tracing();
    ApiClient::new(ClientConfig {
        api_base_url: server.uri(),
        request_timeout_secs: 2,
        ..Default::default()
    })
    .expect("valid config")
}

pub fn bridge(provider: Arc<FakeProvider>, server: &MockServer) -> (AuthBridge, ApiClient, QueryClient) {
    let api = api(server);
    let queries = QueryClient::default();
    let bridge = AuthBridge::for_api(provider, api.clone(), queries.clone());
    (bridge, api, queries)
}

/// How a [`ScriptedExchange`] behaves while its request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Signs the bridge out, then fails.
    SignOutThenFail,
    /// Signs the bridge out, then succeeds.
    SignOutThenSucceed,
    /// Yields to the scheduler, then succeeds.
    YieldThenSucceed,
}

/// Backend exchange that runs a [`Script`] instead of talking HTTP.
pub struct ScriptedExchange {
    bridge: OnceLock<AuthBridge>,
    script: Script,
    pub calls: AtomicUsize,
}

#[async_trait]
impl BackendExchange for ScriptedExchange {
    async fn exchange(&self, _access_token: &str) -> ApiResult<BackendSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::SignOutThenFail | Script::SignOutThenSucceed => {
                if let Some(bridge) = self.bridge.get() {
                    bridge.handle_event(AuthEvent::SignedOut).await;
                }
            }
            Script::YieldThenSucceed => tokio::task::yield_now().await,
        }
        if self.script == Script::SignOutThenFail {
            return Err(ApiError::Status { status: 500, body: None });
        }
        Ok(serde_json::from_value(backend_session("backend-1")).expect("valid backend session"))
    }
}

/// A bridge whose exchange follows `script`, with no query cache.
pub fn scripted_bridge(script: Script) -> (AuthBridge, CredentialStore, Arc<ScriptedExchange>) {
    init_tracing();
    let exchange = Arc::new(ScriptedExchange {
        bridge: OnceLock::new(),
        script,
        calls: AtomicUsize::new(0),
    });
    let credentials = CredentialStore::new();
    let bridge = AuthBridge::new(
        FakeProvider::new(None),
        exchange.clone(),
        credentials.clone(),
        None,
    );
    let _ = exchange.bridge.set(bridge.clone());
    (bridge, credentials, exchange)
}

/// Answers the exchange of `access_token` with `status`, after `delay`.
pub async fn mount_exchange(
    server: &MockServer,
    access_token: &str,
    status: u16,
    body: Value,
    delay: Duration,
) {
    Mock::given(method("POST"))
        .and(path("/auth/session"))
        .and(body_json(json!({"access_token": access_token})))
        .respond_with(ResponseTemplate::new(status).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

pub async fn exchanges(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/auth/session")
        .count()
}

/// Waits until the published state satisfies `done`.
pub async fn wait_for<P>(states: &mut watch::Receiver<SessionState>, done: P) -> SessionState
where
    P: FnMut(&SessionState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(done))
        .await
        .expect("timed out waiting for session state")
        .expect("bridge dropped")
        .clone()
}
