//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Adds re-read price and stock
//! from the backend so a line never starts out above the real stock.

use std::collections::HashSet;

use axum::{Json, extract::State};
use maison_core::{Cart, CartError, LineKey, ProductId, UserSettings};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::BackendError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{
    CartView,
    session::{load, store},
    session_keys,
};
use crate::state::AppState;

/// Add to cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Set quantity request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    #[serde(flatten)]
    pub line: LineKey,
    pub quantity: u32,
}

async fn view(session: &Session, cart: &Cart) -> Result<Json<CartView>> {
    let settings: UserSettings = load(session, session_keys::SETTINGS).await?;
    Ok(Json(CartView::new(cart, settings)))
}

async fn save(session: &Session, cart: &Cart) -> Result<Json<CartView>> {
    store(session, session_keys::CART, cart).await?;
    view(session, cart).await
}

/// `GET /api/session/cart`
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart: Cart = load(&session, session_keys::CART).await?;
    view(&session, &cart).await
}

/// `POST /api/session/cart/items` - add a product with current price and stock.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    if request.quantity == 0 {
        return Err(CartError::InvalidQuantity.into());
    }

    let product = state.backend().product(&request.product_id).await?;
    let item = product.to_cart_item(request.size, request.color, request.quantity);

    let mut cart: Cart = load(&session, session_keys::CART).await?;
    cart.add(item).inspect_err(|e| {
        tracing::debug!(product_id = %request.product_id, error = %e, "Add to cart rejected");
    })?;

    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[("product_id", request.product_id.as_str())]),
    );
    save(&session, &cart).await
}

/// `PATCH /api/session/cart/items` - set a line's quantity (0 removes it).
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<CartView>> {
    let mut cart: Cart = load(&session, session_keys::CART).await?;
    cart.set_quantity(&request.line, request.quantity)?;
    save(&session, &cart).await
}

/// `POST /api/session/cart/items/decrement` - remove one unit.
#[instrument(skip(session))]
pub async fn decrement(session: Session, Json(line): Json<LineKey>) -> Result<Json<CartView>> {
    let mut cart: Cart = load(&session, session_keys::CART).await?;
    cart.decrement(&line)?;
    save(&session, &cart).await
}

/// `DELETE /api/session/cart/items` - remove a line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Json(line): Json<LineKey>) -> Result<Json<CartView>> {
    let mut cart: Cart = load(&session, session_keys::CART).await?;
    if !cart.remove(&line) {
        return Err(CartError::ItemNotFound.into());
    }
    add_breadcrumb(
        "cart",
        "Removed item",
        Some(&[("product_id", line.product_id.as_str())]),
    );
    save(&session, &cart).await
}

/// `DELETE /api/session/cart`
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    let mut cart: Cart = load(&session, session_keys::CART).await?;
    cart.clear();
    save(&session, &cart).await
}

/// `POST /api/session/cart/refresh` - re-read price and stock for every product.
///
/// Products the backend no longer knows are treated as out of stock and
/// dropped. Any other backend failure aborts without touching the cart.
#[instrument(skip(state, session))]
pub async fn refresh(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart: Cart = load(&session, session_keys::CART).await?;

    let mut seen = HashSet::new();
    let product_ids: Vec<ProductId> = cart
        .items()
        .iter()
        .map(|item| item.product_id.clone())
        .filter(|id| seen.insert(id.clone()))
        .collect();

    for id in product_ids {
        match state.backend().product(&id).await {
            Ok(product) => {
                cart.refresh_product(&id, product.price, product.available());
            }
            Err(BackendError::NotFound(_)) => {
                tracing::info!(product_id = %id, "Dropping product missing from backend");
                let price = cart
                    .items()
                    .iter()
                    .find(|item| item.product_id == id)
                    .map(|item| item.price)
                    .unwrap_or_default();
                cart.refresh_product(&id, price, 0);
            }
            Err(e) => return Err(AppError::Backend(e)),
        }
    }

    save(&session, &cart).await
}
