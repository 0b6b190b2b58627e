//! Double-submit CSRF protection.
//!
//! `GET /api/csrf-token` hands the browser a random token as a readable
//! cookie. State-changing requests must echo it back in the `X-CSRF-Token`
//! header (or a `csrfToken` / `_csrf` body field) and the two are compared
//! in constant time before anything reaches the backend.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::cookies;
use crate::error::AppError;

/// Cookie the token is issued under.
pub const CSRF_COOKIE: &str = "csrfToken";

/// Older cookie name still accepted on input.
pub const LEGACY_CSRF_COOKIE: &str = "csrf-token";

/// Header the client echoes the token in.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Body fields checked when the header is absent.
const BODY_FIELDS: [&str; 2] = ["csrfToken", "_csrf"];

/// Raw token length before encoding.
const TOKEN_BYTES: usize = 32;

/// Largest body buffered while looking for a token field (matches the upload limit).
pub const MAX_BUFFERED_BODY: usize = 20 * 1024 * 1024;

/// Generate a fresh token: 32 CSPRNG bytes, base64url without padding.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two tokens without short-circuiting on the first differing byte.
///
/// Inputs of different length are unequal; equal-length inputs are always
/// scanned to the end.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Whether a method is exempt from the check.
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Token from the request cookies (`csrfToken` first, then `csrf-token`).
#[must_use]
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    cookies::get_any(headers, &[CSRF_COOKIE, LEGACY_CSRF_COOKIE])
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Look for a token field in a JSON object or urlencoded form body.
fn body_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.contains("json") {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        BODY_FIELDS.iter().find_map(|field| {
            value
                .get(field)
                .and_then(serde_json::Value::as_str)
                .filter(|v| !v.is_empty())
                .map(String::from)
        })
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<_> = url::form_urlencoded::parse(body).collect();
        BODY_FIELDS.iter().find_map(|field| {
            pairs
                .iter()
                .find(|(key, value)| key == field && !value.is_empty())
                .map(|(_, value)| value.to_string())
        })
    } else {
        None
    }
}

/// Whether the body may carry a token field worth buffering for.
fn may_carry_body_token(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("json") || ct.starts_with("application/x-www-form-urlencoded")
        })
}

/// Middleware enforcing the double-submit check on unsafe methods.
///
/// When the header is missing the body is buffered to look for a token
/// field and then handed on unchanged.
pub async fn csrf_protect(request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let Some(expected) = cookie_token(request.headers()) else {
        tracing::debug!("CSRF cookie missing");
        return AppError::Csrf.into_response();
    };

    let (submitted, request) = match header_token(request.headers()) {
        Some(token) => (Some(token), request),
        None if may_carry_body_token(request.headers()) => {
            let (parts, body) = request.into_parts();
            let bytes: Bytes = match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(error = %e, "failed to buffer body for CSRF check");
                    return AppError::Csrf.into_response();
                }
            };
            let token = body_token(&parts.headers, &bytes);
            (token, Request::from_parts(parts, Body::from(bytes)))
        }
        None => (None, request),
    };

    match submitted {
        Some(token) if constant_time_eq(expected.as_bytes(), token.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::debug!("CSRF token mismatch");
            AppError::Csrf.into_response()
        }
        None => {
            tracing::debug!("CSRF token not submitted");
            AppError::Csrf.into_response()
        }
    }
}
