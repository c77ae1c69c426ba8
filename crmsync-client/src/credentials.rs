//! Shared holder for the backend session token.

use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The bearer token attached to outgoing requests.
///
/// Cloning yields a handle to the same slot, so the auth bridge and the
/// adapter always agree on the current credential.
#[derive(Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Drops the held token. Returns true if one was present.
    pub async fn clear(&self) -> bool {
        self.token.write().await.take().is_some()
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_set(&self) -> bool {
        self.token.read().await.is_some()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Sends the user to the sign-in entry point after a 401.
///
/// The host application decides what a "hard redirect" means for it; the
/// adapter only calls this once per rejected request.
pub trait SignInRedirect: Send + Sync {
    fn redirect_to_sign_in(&self, sign_in_path: &str);
}

impl<F> SignInRedirect for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to_sign_in(&self, sign_in_path: &str) {
        self(sign_in_path)
    }
}

/// Default redirect: only records the event in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl SignInRedirect for LogRedirect {
    fn redirect_to_sign_in(&self, sign_in_path: &str) {
        tracing::warn!(sign_in_path, "session rejected by backend, redirecting to sign-in");
    }
}
