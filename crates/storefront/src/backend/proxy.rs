//! Request and response shaping for the backend reverse proxy.
//!
//! Only a fixed set of top-level API prefixes is relayed. Request headers are
//! allow-listed; response headers are relayed minus hop-by-hop headers.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::Response;

use super::BackendError;
use crate::cookies;
use crate::middleware::{auth::TOKEN_COOKIE, csrf::CSRF_HEADER};

/// First path segments under `/api/` that are relayed to the backend.
pub const ALLOWED_PREFIXES: &[&str] = &[
    "auth",
    "users",
    "products",
    "categories",
    "orders",
    "reviews",
    "coupons",
    "admin",
    "upload",
    "newsletter",
    "contact",
];

/// Headers that describe a single connection and must not be relayed.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

/// How a response body is relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Parsed and re-serialized; unparseable JSON is an upstream failure.
    Json,
    /// Relayed byte-for-byte.
    Binary,
    /// Relayed as-is.
    Text,
}

/// First segment of a path relative to `/api/`.
#[must_use]
pub fn first_segment(path: &str) -> Option<&str> {
    path.trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .filter(|segment| !segment.is_empty())
}

/// Whether the path's first segment is on the allow-list.
#[must_use]
pub fn is_allowed(path: &str) -> bool {
    first_segment(path).is_some_and(|segment| ALLOWED_PREFIXES.contains(&segment))
}

/// Pick the request headers forwarded to the backend.
///
/// If the browser sent no `Authorization` header but has a `token` cookie,
/// the token is forwarded as a bearer token as well.
#[must_use]
pub fn forward_headers(incoming: &HeaderMap) -> HeaderMap {
    let forwarded = [
        header::CONTENT_TYPE,
        header::COOKIE,
        header::AUTHORIZATION,
        header::ACCEPT,
        HeaderName::from_static(CSRF_HEADER),
    ];

    let mut headers = HeaderMap::new();
    for name in forwarded {
        for value in incoming.get_all(&name) {
            headers.append(name.clone(), value.clone());
        }
    }

    if !headers.contains_key(header::AUTHORIZATION)
        && let Some(token) = cookies::get(incoming, TOKEN_COOKIE)
        && let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}"))
    {
        headers.insert(header::AUTHORIZATION, value);
    }

    headers
}

/// Classify a response body by its `Content-Type` and `Content-Encoding`.
#[must_use]
pub fn body_kind(headers: &HeaderMap) -> BodyKind {
    let encoded = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|enc| !enc.eq_ignore_ascii_case("identity"));
    if encoded {
        return BodyKind::Binary;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        BodyKind::Json
    } else if is_binary_mime(&mime) {
        BodyKind::Binary
    } else {
        BodyKind::Text
    }
}

fn is_binary_mime(mime: &str) -> bool {
    ["image/", "audio/", "video/", "font/"]
        .iter()
        .any(|prefix| mime.starts_with(prefix))
        || matches!(
            mime,
            "application/pdf" | "application/octet-stream" | "application/zip"
        )
}

/// Turn a backend response into a response for the browser.
///
/// Status and headers are relayed unchanged apart from hop-by-hop headers.
///
/// # Errors
///
/// Returns `InvalidResponse` if the body claims to be JSON but does not
/// parse, and `Http` if the body cannot be read.
pub async fn relay(upstream: reqwest::Response) -> Result<Response, BackendError> {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    let kind = body_kind(&headers);
    let body = upstream.bytes().await?;

    let body = match kind {
        BodyKind::Json if !body.is_empty() => {
            let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
                tracing::error!(
                    error = %e,
                    status = %status,
                    "Backend sent unparseable JSON"
                );
                BackendError::InvalidResponse(e.to_string())
            })?;
            Bytes::from(
                serde_json::to_vec(&value)
                    .map_err(|e| BackendError::InvalidResponse(e.to_string()))?,
            )
        }
        BodyKind::Text if std::str::from_utf8(&body).is_err() => {
            tracing::debug!(status = %status, "Relaying non-UTF-8 text body unchanged");
            body
        }
        _ => body,
    };

    for name in &HOP_BY_HOP {
        headers.remove(name);
    }

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
