//! Client for the backend API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, products, orders, and
//!   categories - NO local storage, direct API calls
//! - [`proxy`] relays browser requests mostly unchanged
//! - Typed helpers ([`BackendClient::product`], [`BackendClient::current_user`])
//!   back the gateway's own session routes
//!
//! # Example
//!
//! ```rust,ignore
//! use maison_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(config.backend_url.clone())?;
//! let product = client.product(&ProductId::new("64f1...")).await?;
//! ```

pub mod proxy;
pub mod types;

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use maison_core::ProductId;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

pub use types::{BackendUser, ProductSummary};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend unreachable or the connection failed mid-request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a body that could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// Status code returned by the backend.
        status: StatusCode,
        /// Message extracted from the backend's error body.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Client for the backend API.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new backend client for the given origin.
    ///
    /// Redirects are not followed so they can be relayed to the browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner { client, base_url }),
        })
    }

    /// The backend origin.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build `{origin}/api/{path}`, keeping any query string in `path`.
    ///
    /// The allow-list is checked again on the resolved URL, so dot segments
    /// (plain or percent-encoded) cannot move a request into another prefix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if the result is not a valid URL, and
    /// `NotFound` if the resolved path is outside the relayed prefixes.
    pub fn api_url(&self, path: &str) -> Result<Url, BackendError> {
        let path = path.trim_start_matches('/');
        let url = self
            .inner
            .base_url
            .join(&format!("api/{path}"))
            .map_err(|e| BackendError::InvalidResponse(format!("invalid backend url: {e}")))?;

        let relayed = url
            .path()
            .strip_prefix("/api/")
            .is_some_and(proxy::is_allowed);
        if !relayed {
            return Err(BackendError::NotFound(path.to_string()));
        }
        Ok(url)
    }

    /// `{origin}/api/products/{id}` with the id as a single escaped segment.
    fn product_url(&self, id: &ProductId) -> Result<Url, BackendError> {
        let not_found = || BackendError::NotFound(format!("Product {id}"));
        if matches!(id.as_str(), "" | "." | "..") {
            return Err(not_found());
        }

        let mut url = self.api_url("products")?;
        url.path_segments_mut()
            .map_err(|()| not_found())?
            .push(id.as_str());
        Ok(url)
    }

    /// Forward a request to `{origin}/api/{path_and_query}`.
    ///
    /// Non-success statuses are NOT errors here; the caller relays them.
    ///
    /// # Errors
    ///
    /// Returns `Http` if the backend cannot be reached.
    #[instrument(skip(self, headers, body), fields(body_len = body.len()))]
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self.api_url(path_and_query)?;

        let mut request = self.inner.client.request(method, url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    /// Fetch a product's current price and stock.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the backend has no such product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<ProductSummary, BackendError> {
        let envelope: types::ProductEnvelope = self
            .get_json(self.product_url(id)?, None)
            .await
            .map_err(|e| match e {
                BackendError::Status {
                    status: StatusCode::NOT_FOUND,
                    ..
                } => BackendError::NotFound(format!("Product {id}")),
                other => other,
            })?;
        Ok(envelope.into_inner())
    }

    /// Ask the backend who the bearer of `token` is.
    ///
    /// # Errors
    ///
    /// Returns `Status` with the backend's status (typically 401) if the token
    /// is rejected.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &str) -> Result<BackendUser, BackendError> {
        let envelope: types::UserEnvelope = self
            .get_json(self.api_url("auth/me")?, Some(token))
            .await?;
        Ok(envelope.into_inner())
    }

    /// Whether the backend accepts connections at all.
    ///
    /// Any HTTP response counts; only connection failures report `false`.
    pub async fn is_reachable(&self) -> bool {
        match self.inner.client.head(self.inner.base_url.clone()).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Backend unreachable");
                false
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&str>,
    ) -> Result<T, BackendError> {
        let mut request = self
            .inner
            .client
            .get(url)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status,
                message: error_message(status, &body),
            });
        }

        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %String::from_utf8_lossy(&body).chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::InvalidResponse(e.to_string())
        })
    }
}

/// Extract a human-readable message from a backend error body.
///
/// The backend answers `{"message": "..."}` (sometimes `{"error": "..."}`);
/// anything else falls back to the status's reason phrase.
#[must_use]
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> BackendClient {
        BackendClient::new(Url::parse("http://localhost:5000/").unwrap()).unwrap()
    }

    #[test]
    fn test_api_url_keeps_query() {
        let url = client().api_url("products?page=2&sort=price").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/products?page=2&sort=price");
    }

    #[test]
    fn test_api_url_rejects_escape_from_api() {
        let err = client().api_url("products/../../internal").unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[test]
    fn test_api_url_rechecks_prefix_after_dot_segments() {
        for path in [
            "products/../internal/metrics",
            "products/%2e%2e/internal/metrics",
            "orders/%2E%2E/%2e%2e/api/internal",
            "products/./../session",
        ] {
            let err = client().api_url(path).unwrap_err();
            assert!(matches!(err, BackendError::NotFound(_)), "{path}");
        }

        let url = client().api_url("orders/o1/../o2").unwrap();
        assert_eq!(url.path(), "/api/orders/o2");
    }

    #[test]
    fn test_product_url_escapes_id() {
        let url = client()
            .product_url(&ProductId::new("../internal/x"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/products/..%2Finternal%2Fx");

        let url = client().product_url(&ProductId::new("%2e%2e")).unwrap();
        assert_eq!(url.path(), "/api/products/%252e%252e");

        for id in ["", ".", ".."] {
            let err = client().product_url(&ProductId::new(id)).unwrap_err();
            assert!(matches!(err, BackendError::NotFound(_)), "{id:?}");
        }
    }

    #[test]
    fn test_error_message_from_body() {
        let msg = error_message(StatusCode::BAD_REQUEST, br#"{"message":"Email taken"}"#);
        assert_eq!(msg, "Email taken");

        let msg = error_message(StatusCode::BAD_REQUEST, br#"{"error":"Bad coupon"}"#);
        assert_eq!(msg, "Bad coupon");
    }

    #[test]
    fn test_error_message_fallback() {
        let msg = error_message(StatusCode::BAD_GATEWAY, b"<html>oops</html>");
        assert_eq!(msg, "Bad Gateway");
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("Product 1".to_string());
        assert_eq!(err.to_string(), "Not found: Product 1");
    }
}
