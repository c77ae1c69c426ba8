//! Session state machine driving the backend exchange.

use crate::error::{AuthError, AuthResult};
use crate::provider::{AuthEvent, AuthProvider, BackendExchange, ExternalSession};
use crate::state::{AuthPhase, SessionState};
use crmsync_client::{ApiClient, CredentialStore};
use crmsync_query::QueryClient;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Keeps the backend credential in step with the external auth session.
///
/// Cloning yields another handle to the same bridge.
#[derive(Clone)]
pub struct AuthBridge {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn AuthProvider>,
    exchange: Arc<dyn BackendExchange>,
    credentials: CredentialStore,
    queries: Option<QueryClient>,
    state: watch::Sender<SessionState>,
    session: Mutex<SessionSlot>,
    /// Set while an exchange is running.
    exchanging: AtomicBool,
    /// Set once an exchange was attempted for the current sign-in.
    attempted: AtomicBool,
    started: AtomicBool,
}

/// The external session, versioned by every sign-in, refresh and sign-out.
///
/// Credential writes and state publication happen while the slot is locked,
/// so a result for an older generation can never overwrite a newer one.
#[derive(Default)]
struct SessionSlot {
    generation: u64,
    session: Option<ExternalSession>,
}

/// Clears the in-flight flag even if the exchange future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AuthBridge {
    /// Creates a bridge. When `queries` is given, sign-out also empties the
    /// query cache.
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        exchange: Arc<dyn BackendExchange>,
        credentials: CredentialStore,
        queries: Option<QueryClient>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                exchange,
                credentials,
                queries,
                state,
                session: Mutex::new(SessionSlot::default()),
                exchanging: AtomicBool::new(false),
                attempted: AtomicBool::new(false),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Bridge exchanging through `api` and storing the token in its
    /// credential store.
    pub fn for_api(provider: Arc<dyn AuthProvider>, api: ApiClient, queries: QueryClient) -> Self {
        let credentials = api.credentials().clone();
        Self::new(provider, Arc::new(api), credentials, Some(queries))
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Checks the provider for an existing session and exchanges it.
    ///
    /// Only the first call does anything; later calls return the current
    /// state.
    pub async fn initialize(&self) -> SessionState {
        let claimed = self.inner.state.send_if_modified(|state| {
            if state.phase != AuthPhase::Uninitialized {
                return false;
            }
            state.phase = AuthPhase::CheckingExternalSession;
            true
        });
        if !claimed {
            return self.state();
        }

        let generation = self.slot().await.generation;
        let found = self.inner.provider.current_session().await;

        let mut slot = self.slot().await;
        if slot.generation != generation {
            debug!("session changed during initial check");
            return self.state();
        }
        match found {
            Ok(Some(session)) => {
                debug!(user = %session.user.id, "found external session");
                slot.generation += 1;
                slot.session = Some(session);
                drop(slot);
                self.ensure_exchanged().await;
            }
            Ok(None) => {
                debug!("no external session");
                self.inner.state.send_replace(SessionState::signed_out());
            }
            Err(err) => {
                warn!(error = %err, "failed to read external session");
                self.inner.state.send_replace(SessionState {
                    error: Some(err),
                    ..SessionState::signed_out()
                });
            }
        }
        self.state()
    }

    /// Subscribes to provider events and applies them in a background task.
    ///
    /// A bridge consumes events through one subscription only; a second
    /// call fails with [`AuthError::AlreadyStarted`]. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self) -> AuthResult<JoinHandle<()>> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(AuthError::AlreadyStarted);
        }

        let mut events = self.inner.provider.subscribe();
        let bridge = self.clone();
        Ok(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => bridge.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "missed auth events, re-reading session");
                        bridge.resync().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("auth event stream closed");
                        break;
                    }
                }
            }
        }))
    }

    /// Applies one provider event.
    pub async fn handle_event(&self, event: AuthEvent) {
        info!(event = event.name(), "auth event");
        match event {
            AuthEvent::SignedIn(session) => {
                let unchanged = self.slot().await.session.as_ref() == Some(&session);
                if unchanged && self.is_authenticated() {
                    debug!("already authenticated for this session");
                    return;
                }
                self.inner.attempted.store(false, Ordering::Release);
                self.replace_session(Some(session)).await;
                self.drive_exchange().await;
            }
            AuthEvent::TokenRefreshed(session) => {
                self.replace_session(Some(session)).await;
                self.drive_exchange().await;
            }
            AuthEvent::SignedOut => self.apply_sign_out().await,
        }
    }

    /// Exchanges the held external session unless that was already tried
    /// since the last sign-in.
    pub async fn ensure_exchanged(&self) -> SessionState {
        let pending = self.slot().await.session.is_some() && !self.is_authenticated();
        if pending && !self.inner.attempted.load(Ordering::Acquire) {
            self.drive_exchange().await;
        }
        self.state()
    }

    /// Exchanges the held external session again, e.g. after
    /// [`AuthPhase::BackendAuthFailed`]. Does nothing while an exchange is
    /// in flight or when no external session exists.
    pub async fn retry_exchange(&self) -> SessionState {
        let signed_in = self.slot().await.session.is_some();
        if signed_in {
            self.drive_exchange().await;
        }
        self.state()
    }

    /// Ends the external session and drops all backend state. Local state
    /// is cleared even when the provider fails.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let result = self.inner.provider.sign_out().await;
        if let Err(err) = &result {
            warn!(error = %err, "provider sign-out failed");
        }
        self.apply_sign_out().await;
        result
    }

    async fn resync(&self) {
        match self.inner.provider.current_session().await {
            Ok(Some(session)) => self.handle_event(AuthEvent::TokenRefreshed(session)).await,
            Ok(None) => self.apply_sign_out().await,
            Err(err) => warn!(error = %err, "failed to re-read external session"),
        }
    }

    async fn apply_sign_out(&self) {
        let mut slot = self.slot().await;
        slot.generation += 1;
        slot.session = None;
        self.inner.attempted.store(false, Ordering::Release);
        let had_credential = self.inner.credentials.clear().await;
        if let Some(queries) = &self.inner.queries {
            queries.clear();
        }
        self.inner.state.send_replace(SessionState::signed_out());
        drop(slot);
        info!(had_credential, "signed out");
    }

    /// Runs exchanges until one settles for the latest session.
    async fn drive_exchange(&self) {
        loop {
            if self.inner.exchanging.swap(true, Ordering::AcqRel) {
                debug!("backend exchange already in flight");
                return;
            }
            let guard = InFlight(&self.inner.exchanging);
            let settled = self.exchange_once().await;
            drop(guard);

            if settled == self.slot().await.generation {
                return;
            }
        }
    }

    /// One exchange for the current session. Returns the generation it was
    /// started for.
    async fn exchange_once(&self) -> u64 {
        let (generation, session) = {
            let slot = self.slot().await;
            let Some(session) = slot.session.clone() else {
                return slot.generation;
            };
            self.inner.attempted.store(true, Ordering::Release);
            self.inner.state.send_modify(|state| {
                state.phase = AuthPhase::ExchangingBackendToken;
                state.external_user = Some(session.user.clone());
                state.backend_user = None;
                state.error = None;
            });
            (slot.generation, session)
        };
        debug!(user = %session.user.id, "exchanging external session");

        let result = self.inner.exchange.exchange(&session.access_token).await;

        let slot = self.slot().await;
        if slot.generation != generation {
            debug!("discarding exchange for superseded session");
            return generation;
        }
        match result {
            Ok(backend) => {
                self.inner.credentials.set(backend.token).await;
                info!(user = %backend.user.id, "backend session established");
                self.inner.state.send_modify(|state| {
                    state.phase = AuthPhase::Authenticated;
                    state.backend_user = Some(backend.user);
                    state.initial_auth_complete = true;
                    state.error = None;
                });
            }
            Err(err) => {
                warn!(error = %err, "backend session exchange failed");
                self.inner.credentials.clear().await;
                self.inner.state.send_modify(|state| {
                    state.phase = AuthPhase::BackendAuthFailed;
                    state.backend_user = None;
                    state.initial_auth_complete = true;
                    state.error = Some(AuthError::Exchange(err));
                });
            }
        }
        drop(slot);
        generation
    }

    async fn replace_session(&self, session: Option<ExternalSession>) {
        let mut slot = self.slot().await;
        slot.generation += 1;
        slot.session = session;
    }

    async fn slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.inner.session.lock().await
    }
}

impl fmt::Debug for AuthBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthBridge")
            .field("phase", &self.inner.state.borrow().phase)
            .field("exchanging", &self.inner.exchanging.load(Ordering::Relaxed))
            .field("started", &self.inner.started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
