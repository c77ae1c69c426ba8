//! Derived authentication state.

use crate::error::AuthError;
use crate::provider::ExternalUser;
use crmsync_types::BackendUser;
use std::fmt;

/// Where the bridge is in the sign-in flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    CheckingExternalSession,
    Unauthenticated,
    ExchangingBackendToken,
    Authenticated,
    /// The external session is valid but the backend refused it. Left on
    /// the next session change or an explicit retry.
    BackendAuthFailed,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::CheckingExternalSession => "checking_external_session",
            Self::Unauthenticated => "unauthenticated",
            Self::ExchangingBackendToken => "exchanging_backend_token",
            Self::Authenticated => "authenticated",
            Self::BackendAuthFailed => "backend_auth_failed",
        };
        f.write_str(name)
    }
}

/// Snapshot published by [`AuthBridge`](crate::AuthBridge).
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: AuthPhase,
    pub external_user: Option<ExternalUser>,
    pub backend_user: Option<BackendUser>,
    /// Set once the first session check has settled either way.
    pub initial_auth_complete: bool,
    pub error: Option<AuthError>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated && self.backend_user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            AuthPhase::Uninitialized
                | AuthPhase::CheckingExternalSession
                | AuthPhase::ExchangingBackendToken
        )
    }

    pub(crate) fn signed_out() -> Self {
        Self {
            phase: AuthPhase::Unauthenticated,
            initial_auth_complete: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmsync_types::UserId;

    fn backend_user() -> BackendUser {
        BackendUser {
            id: UserId::new("u1"),
            email: None,
            organization_id: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn authenticated_requires_backend_user() {
        let mut state = SessionState {
            phase: AuthPhase::Authenticated,
            ..Default::default()
        };
        assert!(!state.is_authenticated());

        state.backend_user = Some(backend_user());
        assert!(state.is_authenticated());

        state.phase = AuthPhase::BackendAuthFailed;
        assert!(!state.is_authenticated());
    }

    #[test]
    fn signed_out_is_settled() {
        let state = SessionState::signed_out();
        assert_eq!(state.phase, AuthPhase::Unauthenticated);
        assert!(state.initial_auth_complete);
        assert!(!state.is_loading());
    }
}
