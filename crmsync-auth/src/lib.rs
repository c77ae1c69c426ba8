//! Auth/session bridge for crmsync.
//!
//! The host signs users in with a third-party auth provider. The backend
//! only accepts its own session token, so [`AuthBridge`] exchanges the
//! provider's access token for one and keeps the result in the shared
//! [`CredentialStore`](crmsync_client::CredentialStore).
//!
//! ```text
//! Uninitialized ─▶ CheckingExternalSession ─┬─▶ Unauthenticated
//!                                           │
//!                                           └─▶ ExchangingBackendToken ─┬─▶ Authenticated
//!                                                  ▲                    │
//!                                                  │                    └─▶ BackendAuthFailed
//!                                                  └── sign-in / refresh / retry ◀──┘
//!
//! any ──(signed out)──▶ Unauthenticated, credential cleared
//! ```
//!
//! A failed exchange never forgets the external session, so a retry does
//! not require signing in again.

mod bridge;
mod error;
mod provider;
mod state;

pub use bridge::AuthBridge;
pub use error::{AuthError, AuthResult};
pub use provider::{AuthEvent, AuthProvider, BackendExchange, ExternalSession, ExternalUser};
pub use state::{AuthPhase, SessionState};
