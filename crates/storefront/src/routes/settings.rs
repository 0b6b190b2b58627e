//! Visitor display settings.

use axum::Json;
use maison_core::UserSettings;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::models::{
    session::{load, store},
    session_keys,
};

/// `GET /api/session/settings`
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<UserSettings>> {
    Ok(Json(load(&session, session_keys::SETTINGS).await?))
}

/// `PUT /api/session/settings` - replace language and currency.
///
/// Omitted fields fall back to the defaults.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Json(settings): Json<UserSettings>,
) -> Result<Json<UserSettings>> {
    store(&session, session_keys::SETTINGS, &settings).await?;
    tracing::debug!(language = %settings.language, currency = settings.currency.code(), "Settings updated");
    Ok(Json(settings))
}
