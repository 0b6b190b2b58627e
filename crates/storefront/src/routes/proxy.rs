//! Backend reverse proxy handler.

use axum::{
    Extension,
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, HeaderValue, Method},
    response::Response,
};
use tracing::instrument;

use crate::backend::BackendError;
use crate::backend::proxy::{forward_headers, is_allowed, relay};
use crate::error::{AppError, Result};
use crate::middleware::OptionalClaims;
use crate::middleware::request_id::{REQUEST_ID_HEADER, RequestId};
use crate::state::AppState;

/// `ANY /api/{*path}` - relay an allow-listed API call to the backend.
///
/// Unlisted prefixes are answered here with a 404 and never reach the
/// backend, including paths whose dot segments resolve into one. The path is taken from the raw URI so percent-encoding
/// survives unchanged. Verified claims only label the span; the backend
/// makes every authorization decision.
#[instrument(skip_all, fields(method = %method, path = %uri.path(), user_id = tracing::field::Empty))]
pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    OptionalClaims(claims): OptionalClaims,
    request_id: Option<Extension<RequestId>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if let Some(claims) = &claims {
        tracing::Span::current().record("user_id", claims.id.as_str());
    }

    let path = uri.path().strip_prefix("/api/").unwrap_or_default();
    if !is_allowed(path) {
        tracing::debug!(path, "Rejected unlisted API prefix");
        return Err(not_found());
    }

    let target = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut outgoing = forward_headers(&headers);
    if let Some(Extension(RequestId(id))) = request_id
        && let Ok(value) = HeaderValue::from_str(&id)
    {
        outgoing.insert(REQUEST_ID_HEADER, value);
    }

    let upstream = match state.backend().forward(method, &target, outgoing, body).await {
        Ok(upstream) => upstream,
        Err(BackendError::NotFound(_)) => {
            tracing::debug!(path = %target, "Rejected path resolving outside relayed prefixes");
            return Err(not_found());
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %target, "Backend request failed");
            return Err(e.into());
        }
    };

    tracing::debug!(status = %upstream.status(), "Backend responded");
    Ok(relay(upstream).await?)
}

fn not_found() -> AppError {
    AppError::NotFound("API route not found".to_string())
}
