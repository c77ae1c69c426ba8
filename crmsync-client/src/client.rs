//! Backend REST adapter.
//!
//! Every backend call goes through [`ApiClient`]: it attaches the bearer
//! credential, logs each request and response, and turns a 401 into a
//! cleared credential plus a sign-in redirect.

use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, LogRedirect, SignInRedirect};
use crate::error::{ApiError, ApiResult};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest payload rendering written to the log.
const MAX_LOGGED_PAYLOAD: usize = 2048;

/// A successful (2xx) backend response with its parsed body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` for empty bodies, a string for non-JSON text.
    pub body: Value,
}

impl ApiResponse {
    /// Deserializes the body into `T`.
    pub fn json<T: DeserializeOwned>(self) -> ApiResult<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Whether a request carries the session credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    /// No credential attached and no sign-in redirect on 401.
    Public,
}

/// Backend REST adapter. Cheap to clone; clones share the HTTP pool and credential.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    http: Client,
    credentials: CredentialStore,
    redirect: Arc<dyn SignInRedirect>,
}

impl ApiClient {
    /// Creates an adapter with its own credential slot and a logging redirect.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        Self::with_parts(config, CredentialStore::new(), Arc::new(LogRedirect))
    }

    /// Creates an adapter sharing `credentials` with other components.
    pub fn with_parts(
        config: ClientConfig,
        credentials: CredentialStore,
        redirect: Arc<dyn SignInRedirect>,
    ) -> ApiResult<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                credentials,
                redirect,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Joins `path` onto the configured base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Issues a request with an optional JSON body and extra headers.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<HeaderMap>,
    ) -> ApiResult<ApiResponse> {
        self.execute(method, path, None, body, headers, Auth::Bearer)
            .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(Method::GET, path, None, None, None, Auth::Bearer)
            .await?
            .json()
    }

    /// GET with `query` serialized into the query string.
    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let query = serde_json::to_value(query)?;
        self.execute(Method::GET, path, Some(&query), None, None, Auth::Bearer)
            .await?
            .json()
    }

    /// Sends `body` as JSON and deserializes the response.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(method, path, None, Some(&body), None, Auth::Bearer)
            .await?
            .json()
    }

    /// DELETE, ignoring any response body.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(Method::DELETE, path, None, None, None, Auth::Bearer)
            .await
            .map(|_| ())
    }

    /// POST without the session credential. A 401 here is returned to the
    /// caller as-is and does not redirect.
    pub async fn post_public<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, None, Some(&body), None, Auth::Public)
            .await?
            .json()
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Option<&Value>,
        body: Option<&Value>,
        headers: Option<HeaderMap>,
        auth: Auth,
    ) -> ApiResult<ApiResponse> {
        debug!(method = %method, path, payload = %render_payload(body), "api request");

        let mut request = self.inner.http.request(method.clone(), self.url(path));
        if let Some(query) = query.filter(|q| q.is_object()) {
            request = request.query(query);
        }
        if let Some(headers) = headers {
            request = request.headers(headers);
        }
        if auth == Auth::Bearer {
            if let Some(token) = self.inner.credentials.get().await {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = ApiError::from(e);
                warn!(method = %method, path, error = %err, "api request failed");
                return Err(err);
            }
        };

        let status = response.status().as_u16();
        let body = parse_body(response.text().await?);
        debug!(method = %method, path, status, payload = %render_payload(Some(&body)), "api response");

        if status == 401 && auth == Auth::Bearer {
            self.reject_session(path).await;
            return Err(ApiError::Unauthorized);
        }

        if (200..300).contains(&status) {
            Ok(ApiResponse { status, body })
        } else {
            Err(ApiError::from_status(status, path, body))
        }
    }

    /// Clears the credential and sends the user to sign in. The original
    /// request is not retried.
    async fn reject_session(&self, path: &str) {
        let had_token = self.inner.credentials.clear().await;
        warn!(path, had_token, "backend returned 401, credential cleared");
        self.inner
            .redirect
            .redirect_to_sign_in(&self.inner.config.sign_in_path);
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base_url", &self.inner.config.api_base_url)
            .finish_non_exhaustive()
    }
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

/// Renders a payload for the log. Never fails; long payloads are truncated.
fn render_payload(body: Option<&Value>) -> String {
    let rendered = match body {
        None | Some(Value::Null) => return "-".to_string(),
        Some(value) => value.to_string(),
    };
    if rendered.len() <= MAX_LOGGED_PAYLOAD {
        return rendered;
    }
    let cut = (0..=MAX_LOGGED_PAYLOAD)
        .rev()
        .find(|i| rendered.is_char_boundary(*i))
        .unwrap_or(0);
    format!("{}... ({} bytes)", &rendered[..cut], rendered.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_payload_handles_empty_bodies() {
        assert_eq!(render_payload(None), "-");
        assert_eq!(render_payload(Some(&Value::Null)), "-");
    }

    #[test]
    fn render_payload_truncates_long_bodies() {
        let long = json!({"text": "é".repeat(MAX_LOGGED_PAYLOAD)});
        let rendered = render_payload(Some(&long));
        assert!(rendered.ends_with("bytes)"));
        assert!(rendered.len() < long.to_string().len());
    }

    #[test]
    fn parse_body_keeps_non_json_text() {
        assert_eq!(parse_body(String::new()), Value::Null);
        assert_eq!(parse_body("oops".into()), json!("oops"));
        assert_eq!(parse_body("{\"a\":1}".into()), json!({"a": 1}));
    }
}
