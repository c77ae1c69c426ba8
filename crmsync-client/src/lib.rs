//! REST adapter for the crmsync backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ ApiClient                                   │
//! │  request / get_json / send_json / delete    │
//! ├─────────────────────────────────────────────┤
//! │ CredentialStore (bearer token, shared)      │
//! │ SignInRedirect  (invoked on 401)            │
//! ├─────────────────────────────────────────────┤
//! │ reqwest (timeout per request)               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Interpretation of failures is left to callers: the adapter only maps
//! status codes onto [`ApiError`] and handles 401 centrally.

mod client;
mod config;
mod credentials;
mod error;

pub use client::{ApiClient, ApiResponse};
pub use config::{
    ClientConfig, ENV_API_BASE_URL, ENV_AUTH_KEY, ENV_AUTH_URL, ENV_REQUEST_TIMEOUT_SECS,
    ENV_SURVEY_URL,
};
pub use credentials::{CredentialStore, LogRedirect, SignInRedirect};
pub use error::{ApiError, ApiResult};

pub use reqwest::Method;
pub use reqwest::header::HeaderMap;
