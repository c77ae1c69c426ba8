//! Seams to the external auth provider and the backend session endpoint.

use crate::error::AuthResult;
use async_trait::async_trait;
use crmsync_client::{ApiClient, ApiResult};
use crmsync_types::BackendSession;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// User as reported by the external auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session issued by the external auth provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSession {
    pub access_token: String,
    pub user: ExternalUser,
}

impl fmt::Debug for ExternalSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalSession")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Session change reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(ExternalSession),
    TokenRefreshed(ExternalSession),
    SignedOut,
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn(_) => "signed_in",
            Self::TokenRefreshed(_) => "token_refreshed",
            Self::SignedOut => "signed_out",
        }
    }
}

/// Third-party auth provider issuing the external session.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the session the provider currently holds, if any.
    async fn current_session(&self) -> AuthResult<Option<ExternalSession>>;

    /// Subscribes to session changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Ends the external session. The provider is expected to emit
    /// [`AuthEvent::SignedOut`] afterwards.
    async fn sign_out(&self) -> AuthResult<()>;
}

/// Converts an external access token into a backend session.
#[async_trait]
pub trait BackendExchange: Send + Sync {
    async fn exchange(&self, access_token: &str) -> ApiResult<BackendSession>;
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    access_token: &'a str,
}

/// `POST /auth/session`. Sent without a bearer token.
#[async_trait]
impl BackendExchange for ApiClient {
    async fn exchange(&self, access_token: &str) -> ApiResult<BackendSession> {
        self.post_public("/auth/session", &ExchangeRequest { access_token })
            .await
    }
}
