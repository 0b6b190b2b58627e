//! Identity endpoints for the front end.
//!
//! `/me` answers from the locally verified token; `/admin` asks the backend,
//! which stays the authority on roles.

use axum::{Json, extract::State};
use maison_core::SessionClaims;
use tracing::instrument;

use crate::backend::BackendUser;
use crate::error::{AppError, Result};
use crate::middleware::{AuthToken, RequireClaims};
use crate::state::AppState;

/// `GET /api/session/me` - decoded claims of the current token.
#[instrument(skip_all)]
pub async fn me(RequireClaims(claims): RequireClaims) -> Json<SessionClaims> {
    Json(claims)
}

/// `GET /api/session/admin` - admin who-am-I.
///
/// Forwards the visitor's token to the backend's `auth/me`. The backend's
/// 401 is relayed; a non-admin user is a 403.
#[instrument(skip_all)]
pub async fn admin(
    State(state): State<AppState>,
    AuthToken(token): AuthToken,
) -> Result<Json<BackendUser>> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

    let user = state.backend().current_user(&token).await?;
    if !user.is_admin() {
        tracing::info!(user_id = %user.id, "Admin check refused for non-admin user");
        return Err(AppError::Forbidden("Not authorized as an admin".to_string()));
    }

    Ok(Json(user))
}
