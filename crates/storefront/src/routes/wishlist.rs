//! Wishlist route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use maison_core::{ProductId, UserSettings, Wishlist};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::{
    WishlistView,
    session::{load, store},
    session_keys,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest {
    pub product_id: ProductId,
}

/// Result of a toggle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    /// Whether the product is in the wishlist after the toggle.
    pub in_wishlist: bool,
    pub wishlist: WishlistView,
}

async fn view(session: &Session, wishlist: &Wishlist) -> Result<WishlistView> {
    let settings: UserSettings = load(session, session_keys::SETTINGS).await?;
    Ok(WishlistView::new(wishlist, settings))
}

/// `GET /api/session/wishlist`
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<WishlistView>> {
    let wishlist: Wishlist = load(&session, session_keys::WISHLIST).await?;
    Ok(Json(view(&session, &wishlist).await?))
}

/// `POST /api/session/wishlist` - add a product; adding twice is a no-op.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<WishlistView>> {
    let mut wishlist: Wishlist = load(&session, session_keys::WISHLIST).await?;

    if !wishlist.contains(&request.product_id) {
        let product = state.backend().product(&request.product_id).await?;
        wishlist.add(product.to_wishlist_item());
        store(&session, session_keys::WISHLIST, &wishlist).await?;
    }

    Ok(Json(view(&session, &wishlist).await?))
}

/// `POST /api/session/wishlist/toggle`
#[instrument(skip(state, session))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<ToggleResponse>> {
    let mut wishlist: Wishlist = load(&session, session_keys::WISHLIST).await?;

    let in_wishlist = if wishlist.contains(&request.product_id) {
        wishlist.remove(&request.product_id);
        false
    } else {
        let product = state.backend().product(&request.product_id).await?;
        wishlist.toggle(product.to_wishlist_item())
    };
    store(&session, session_keys::WISHLIST, &wishlist).await?;

    Ok(Json(ToggleResponse {
        in_wishlist,
        wishlist: view(&session, &wishlist).await?,
    }))
}

/// `DELETE /api/session/wishlist/{id}`
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<WishlistView>> {
    let mut wishlist: Wishlist = load(&session, session_keys::WISHLIST).await?;
    if !wishlist.remove(&product_id) {
        return Err(AppError::NotFound("Item not found in wishlist".to_string()));
    }
    store(&session, session_keys::WISHLIST, &wishlist).await?;
    Ok(Json(view(&session, &wishlist).await?))
}
