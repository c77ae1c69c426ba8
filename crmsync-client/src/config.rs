//! Client configuration.
//!
//! Read once at startup, usually from the environment, and never
//! revalidated at runtime.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "CRM_API_BASE_URL";
pub const ENV_AUTH_URL: &str = "CRM_AUTH_URL";
pub const ENV_AUTH_KEY: &str = "CRM_AUTH_KEY";
pub const ENV_SURVEY_URL: &str = "CRM_SURVEY_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CRM_REQUEST_TIMEOUT_SECS";

/// Configuration for the backend adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST backend (e.g. `https://api.example.com`).
    pub api_base_url: String,
    /// Base URL of the external auth provider.
    pub auth_url: String,
    /// Public key for the external auth provider.
    pub auth_key: String,
    /// Survey platform page embedded in the iframe.
    pub survey_url: String,
    /// Where a 401 sends the user.
    pub sign_in_path: String,
    /// Upper bound for a single request (in seconds).
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            auth_url: String::new(),
            auth_key: String::new(),
            survey_url: "https://app.formbricks.com/s".to_string(),
            sign_in_path: "/login".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Builds the config from process environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    ///
    /// `CRM_API_BASE_URL` is required; everything else falls back to
    /// [`ClientConfig::default`].
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let api_base_url = lookup(ENV_API_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{ENV_API_BASE_URL} is not set")))?;

        let request_timeout_secs = match lookup(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("{ENV_REQUEST_TIMEOUT_SECS} must be a number, got {raw:?}"))
            })?,
            None => defaults.request_timeout_secs,
        };

        let config = Self {
            api_base_url,
            auth_url: lookup(ENV_AUTH_URL).unwrap_or(defaults.auth_url),
            auth_key: lookup(ENV_AUTH_KEY).unwrap_or(defaults.auth_key),
            survey_url: lookup(ENV_SURVEY_URL).unwrap_or(defaults.survey_url),
            sign_in_path: defaults.sign_in_path,
            request_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that URLs are http(s) and the timeout is non-zero.
    pub fn validate(&self) -> ApiResult<()> {
        validate_url("api_base_url", &self.api_base_url)?;
        if !self.auth_url.is_empty() {
            validate_url("auth_url", &self.auth_url)?;
        }
        if self.request_timeout_secs == 0 {
            return Err(ApiError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn validate_url(field: &str, value: &str) -> ApiResult<()> {
    let parsed = reqwest::Url::parse(value)
        .map_err(|e| ApiError::Config(format!("{field} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ApiError::Config(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}
