//! Cookie header helpers.

use axum::http::{HeaderMap, header};
use tower_sessions::cookie::Cookie;

/// Read a cookie value from every `Cookie` header on the request.
///
/// Malformed pairs are skipped; the first match wins.
#[must_use]
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Read the first cookie present from a list of names.
#[must_use]
pub fn get_any(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| get(headers, name))
}
