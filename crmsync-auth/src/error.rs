//! Error types for the auth bridge.

use crmsync_client::ApiError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The external auth provider failed to report or end a session.
    #[error("auth provider error: {0}")]
    Provider(String),

    /// The backend refused to issue a session for the external token.
    #[error("backend session exchange failed: {0}")]
    Exchange(#[from] ApiError),

    /// Provider events are already being consumed by this bridge.
    #[error("auth bridge already started")]
    AlreadyStarted,
}

impl AuthError {
    /// Text suitable for showing next to a sign-in form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Exchange(err) => err.user_message(),
            Self::Provider(_) => "Sign-in is currently unavailable. Please try again.".to_string(),
            Self::AlreadyStarted => self.to_string(),
        }
    }
}
