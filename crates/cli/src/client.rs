//! HTTP client for the storefront gateway.
//!
//! The script-side half of the double-submit CSRF pattern: a cookie store
//! keeps the `csrfToken` cookie, and the same token is cached (30-minute TTL)
//! and echoed in `X-CSRF-Token` on every state-changing request.
//!
//! # Example
//!
//! ```rust,ignore
//! use maison_cli::GatewayClient;
//!
//! let client = GatewayClient::new("http://localhost:3000".parse()?)?;
//! let response = client
//!     .request(Method::POST, "/api/newsletter", Some(json!({"email": "a@b.c"})))
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

/// Header the gateway reads the echoed token from.
pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_TOKEN_PATH: &str = "api/csrf-token";
const WHOAMI_PATH: &str = "api/session/admin";
const HEALTH_PATH: &str = "health/ready";

/// Errors from gateway calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout, or body read failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The gateway answered with a non-success status.
    #[error("Gateway returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The gateway answered with a body that could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Fetching a CSRF token failed.
    #[error("CSRF token unavailable: {0}")]
    CsrfToken(Arc<ClientError>),
}

impl ClientError {
    /// Whether retrying the same request might succeed.
    ///
    /// Only connection failures and timeouts count; HTTP statuses never do.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::CsrfToken(inner) => inner.is_transient(),
            Self::InvalidUrl(_) | Self::Status { .. } | Self::InvalidResponse(_) => false,
        }
    }
}

/// Tunables for [`GatewayClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// How long a fetched CSRF token is reused.
    pub token_ttl: Duration,
    /// Abort the token fetch after this long.
    pub token_timeout: Duration,
    /// Backend session token sent as a bearer token, if any.
    pub bearer_token: Option<SecretString>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(30 * 60),
            token_timeout: Duration::from_secs(10),
            bearer_token: None,
        }
    }
}

/// A gateway response: status plus body.
///
/// JSON bodies are parsed; other bodies are kept as a string value.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

/// The admin identity returned by the who-am-I endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminIdentity {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenBody {
    csrf_token: String,
}

/// Client for the storefront gateway.
///
/// Cheaply cloneable; clones share the cookie store and token cache.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<GatewayClientInner>,
}

struct GatewayClientInner {
    http: reqwest::Client,
    base_url: Url,
    tokens: Cache<(), String>,
    options: ClientOptions,
}

impl GatewayClient {
    /// Create a client with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_options(base_url: Url, options: ClientOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let tokens = Cache::builder()
            .max_capacity(1)
            .time_to_live(options.token_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(GatewayClientInner {
                http,
                base_url,
                tokens,
                options,
            }),
        })
    }

    /// The gateway origin.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.options.bearer_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Current CSRF token, fetching one if the cache is empty or expired.
    ///
    /// Concurrent callers share a single fetch.
    ///
    /// # Errors
    ///
    /// Returns `CsrfToken` if the fetch fails or exceeds the token timeout.
    pub async fn csrf_token(&self) -> Result<String, ClientError> {
        self.inner
            .tokens
            .try_get_with((), self.fetch_csrf_token())
            .await
            .map_err(ClientError::CsrfToken)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate_csrf_token(&self) {
        self.inner.tokens.invalidate(&()).await;
    }

    #[instrument(skip(self))]
    async fn fetch_csrf_token(&self) -> Result<String, ClientError> {
        let response = self
            .inner
            .http
            .get(self.url(CSRF_TOKEN_PATH)?)
            .timeout(self.inner.options.token_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: CsrfTokenBody = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        tracing::debug!("Fetched CSRF token");
        Ok(body.csrf_token)
    }

    /// Send a request to the gateway.
    ///
    /// State-changing methods carry the CSRF header. A 403 on such a call
    /// invalidates the cached token. Non-success statuses are returned, not
    /// raised, so callers can inspect them.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be fetched or the gateway is
    /// unreachable.
    #[instrument(skip(self, body), fields(method = %method))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, ClientError> {
        let state_changing = !is_safe_method(&method);

        let mut request = self.authorized(self.inner.http.request(method, self.url(path)?));
        if state_changing {
            request = request.header(CSRF_HEADER, self.csrf_token().await?);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if state_changing && status == StatusCode::FORBIDDEN {
            tracing::debug!("Gateway rejected request with 403; dropping cached CSRF token");
            self.invalidate_csrf_token().await;
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let text = response.text().await?;

        let body = if text.is_empty() {
            serde_json::Value::Null
        } else if is_json {
            serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))?
        } else {
            serde_json::Value::String(text)
        };

        Ok(ApiResponse { status, body })
    }

    /// Admin who-am-I.
    ///
    /// Retried once on connection failures or timeouts; HTTP errors
    /// (401, 403) are returned immediately.
    ///
    /// # Errors
    ///
    /// Returns `Status` if the gateway refuses the caller.
    pub async fn whoami(&self) -> Result<AdminIdentity, ClientError> {
        match self.whoami_once().await {
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "who-am-I failed, retrying once");
                self.whoami_once().await
            }
            result => result,
        }
    }

    #[instrument(skip(self))]
    async fn whoami_once(&self) -> Result<AdminIdentity, ClientError> {
        let response = self
            .authorized(self.inner.http.get(self.url(WHOAMI_PATH)?))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Whether the gateway reports ready (backend reachable).
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway itself is unreachable.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.inner.http.get(self.url(HEALTH_PATH)?).send().await?;
        Ok(response.status().is_success())
    }
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Build a `Status` error from a `{"message": ...}` body.
fn status_error(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
    ClientError::Status { status, message }
}
