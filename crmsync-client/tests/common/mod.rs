//! Shared test helpers for adapter tests.

#![allow(dead_code)]

use crmsync_client::{ApiClient, ClientConfig, CredentialStore, SignInRedirect};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::MockServer;

/// Installs a test subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Redirect that records every sign-in path it was asked to visit.
#[derive(Default)]
pub struct RecordingRedirect {
    pub calls: AtomicUsize,
    pub last_path: Mutex<Option<String>>,
}

impl RecordingRedirect {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SignInRedirect for RecordingRedirect {
    fn redirect_to_sign_in(&self, sign_in_path: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_path.lock().unwrap() = Some(sign_in_path.to_string());
    }
}

pub fn mock_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_base_url: server.uri(),
        request_timeout_secs: 2,
        ..Default::default()
    }
}

/// Adapter pointed at `server`, plus handles to its credential and redirect.
pub fn mock_client(server: &MockServer) -> (ApiClient, CredentialStore, Arc<RecordingRedirect>) {
    init_tracing();
    let credentials = CredentialStore::new();
    let redirect = Arc::new(RecordingRedirect::default());
    let client = ApiClient::with_parts(mock_config(server), credentials.clone(), redirect.clone())
        .expect("valid config");
    (client, credentials, redirect)
}
