//! CSRF token issuance.

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, header},
    response::IntoResponse,
};
use serde::Serialize;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::csrf::{CSRF_COOKIE, generate_token};
use crate::state::AppState;

/// Lifetime of an issued token cookie.
const TOKEN_MAX_AGE_HOURS: i64 = 24;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: String,
}

/// Build the `Set-Cookie` value for a token.
///
/// The cookie is readable from script so the client can echo it in a header.
#[must_use]
pub fn token_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token.to_string()))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(false)
        .secure(secure)
        .max_age(Duration::hours(TOKEN_MAX_AGE_HOURS))
        .build()
}

/// `GET /api/csrf-token` - issue a fresh token and set it as a cookie.
#[instrument(skip(state))]
pub async fn issue(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let token = generate_token();
    let cookie = token_cookie(&token, state.config().is_secure());
    let cookie = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::Internal(format!("invalid cookie header: {e}")))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(CsrfTokenResponse { csrf_token: token }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cookie_attributes() {
        let rendered = token_cookie("abc", true).to_string();
        assert!(rendered.starts_with("csrfToken=abc"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Max-Age=86400"));
        assert!(!rendered.contains("HttpOnly"));
    }

    #[test]
    fn test_token_cookie_insecure_for_http_sites() {
        assert!(!token_cookie("abc", false).to_string().contains("Secure"));
    }
}
