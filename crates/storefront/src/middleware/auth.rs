//! Authentication extractors and the admin page gate.
//!
//! The backend issues the session token (a `token` cookie or a bearer
//! header). Here it is only decoded to shape the UI; the backend repeats
//! every check, so nothing in this module blocks proxying.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use maison_core::SessionClaims;

use crate::cookies;
use crate::error::AppError;
use crate::state::AppState;

/// Cookie the backend stores the session token in.
pub const TOKEN_COOKIE: &str = "token";

/// Login page used for HTML redirects.
const LOGIN_PATH: &str = "/login";

/// Read the raw token: `Authorization: Bearer` first, then the `token` cookie.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| cookies::get(headers, TOKEN_COOKIE))
}

/// Verify an HS256 token and return its claims.
///
/// Expired tokens, bad signatures, and malformed payloads all yield `None`.
#[must_use]
pub fn decode_claims(key: &DecodingKey, token: &str) -> Option<SessionClaims> {
    let validation = Validation::new(Algorithm::HS256);
    match decode::<SessionClaims>(token, key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "session token rejected");
            None
        }
    }
}

fn claims_from_parts(parts: &Parts, state: &AppState) -> Option<SessionClaims> {
    let key = state.jwt_key()?;
    let token = token_from_headers(&parts.headers)?;
    decode_claims(key, &token)
}

/// `/login?redirect=<path>` for the current request.
fn login_redirect(path_and_query: &str) -> Redirect {
    let target: String = url::form_urlencoded::byte_serialize(path_and_query.as_bytes()).collect();
    Redirect::to(&format!("{LOGIN_PATH}?redirect={target}"))
}

fn path_and_query(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string)
}

/// Error returned when an extractor needs claims the request does not carry.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (for page requests).
    RedirectToLogin(String),
    /// 401 for API requests without a valid token.
    Unauthorized,
    /// 403 for API requests with a valid non-admin token.
    Forbidden,
}

impl AuthRejection {
    fn for_request(parts: &Parts, api: Self) -> Self {
        if parts.uri.path().starts_with("/api/") {
            api
        } else {
            Self::RedirectToLogin(path_and_query(parts))
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(from) => login_redirect(&from).into_response(),
            Self::Unauthorized => {
                AppError::Unauthorized("Not authorized, no valid token".to_string())
                    .into_response()
            }
            Self::Forbidden => {
                AppError::Forbidden("Not authorized as an admin".to_string()).into_response()
            }
        }
    }
}

/// Raw session token, if the request carries one.
pub struct AuthToken(pub Option<String>);

impl FromRequestParts<AppState> for AuthToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(token_from_headers(&parts.headers)))
    }
}

/// Locally verified claims, or `None` when absent, invalid, or unverifiable.
///
/// ```rust,ignore
/// async fn handler(OptionalClaims(claims): OptionalClaims) -> impl IntoResponse {
///     claims.map_or("guest".to_string(), |c| c.id.to_string())
/// }
/// ```
pub struct OptionalClaims(pub Option<SessionClaims>);

impl FromRequestParts<AppState> for OptionalClaims {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(claims_from_parts(parts, state)))
    }
}

/// Extractor that requires valid claims.
pub struct RequireClaims(pub SessionClaims);

impl FromRequestParts<AppState> for RequireClaims {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        claims_from_parts(parts, state)
            .map(Self)
            .ok_or_else(|| AuthRejection::for_request(parts, AuthRejection::Unauthorized))
    }
}

/// Extractor that requires valid claims with the admin role.
pub struct RequireAdmin(pub SessionClaims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireClaims(claims) = RequireClaims::from_request_parts(parts, state).await?;
        if claims.is_admin() {
            Ok(Self(claims))
        } else {
            Err(AuthRejection::for_request(parts, AuthRejection::Forbidden))
        }
    }
}

/// Gate for `/admin` pages.
///
/// With a verification secret configured, visitors without admin claims
/// are sent to the login page. Without one the page is served and the
/// admin console's own who-am-I call decides.
pub async fn admin_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.jwt_key().is_none() {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    match RequireAdmin::from_request_parts(&mut parts, &state).await {
        Ok(RequireAdmin(claims)) => {
            tracing::debug!(user_id = %claims.id, "admin page access");
            next.run(Request::from_parts(parts, body)).await
        }
        Err(rejection) => {
            tracing::debug!(path = %parts.uri.path(), "admin page requested without admin claims");
            rejection.into_response()
        }
    }
}
