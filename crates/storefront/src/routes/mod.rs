//! HTTP route handlers for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (backend reachable)
//!
//! # Front-end bootstrap
//! GET  /api/csrf-token                 - Issue a double-submit token
//! GET  /api/config                     - Public settings (site URL, Google client id)
//!
//! # Visitor session (CSRF-checked)
//! GET    /api/session/cart             - Cart with display prices
//! DELETE /api/session/cart             - Empty the cart
//! POST   /api/session/cart/items       - Add (stock-checked against the backend)
//! PATCH  /api/session/cart/items       - Set quantity
//! DELETE /api/session/cart/items       - Remove a line
//! POST   /api/session/cart/items/decrement
//! POST   /api/session/cart/refresh     - Re-read price and stock
//! GET    /api/session/wishlist
//! POST   /api/session/wishlist         - Add (deduplicated)
//! POST   /api/session/wishlist/toggle
//! DELETE /api/session/wishlist/{id}
//! GET    /api/session/settings
//! PUT    /api/session/settings
//! GET    /api/session/me               - Locally decoded claims
//! GET    /api/session/admin            - Admin who-am-I via the backend
//!
//! # Backend proxy (CSRF-checked, 20 MiB body limit)
//! ANY  /api/auth/{*rest}               - Rate limited per IP
//! ANY  /api/{*path}                    - Allow-listed prefixes only
//!
//! # Front end
//! GET  /admin, /admin/{*rest}          - Admin console, gated on admin claims
//! GET  /*                              - Static files, `index.html` fallback
//! ```

pub mod account;
pub mod cart;
pub mod csrf;
pub mod proxy;
pub mod settings;
pub mod wishlist;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    routing::{any, delete, get, get_service, post},
};
use serde::Serialize;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::{admin_gate, auth_rate_limiter, csrf::MAX_BUFFERED_BODY, csrf_protect};
use crate::state::AppState;

/// Create the visitor session routes router.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route(
            "/cart/items",
            post(cart::add).patch(cart::update).delete(cart::remove),
        )
        .route("/cart/items/decrement", post(cart::decrement))
        .route("/cart/refresh", post(cart::refresh))
        .route("/wishlist", get(wishlist::show).post(wishlist::add))
        .route("/wishlist/toggle", post(wishlist::toggle))
        .route("/wishlist/{id}", delete(wishlist::remove))
        .route("/settings", get(settings::show).put(settings::update))
        .route("/me", get(account::me))
        .route("/admin", get(account::admin))
        .route_layer(middleware::from_fn(csrf_protect))
}

/// Create the backend proxy routes router.
pub fn proxy_routes() -> Router<AppState> {
    let auth = Router::new()
        .route("/auth/{*rest}", any(proxy::forward))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/{*path}", any(proxy::forward))
        .merge(auth)
        .route_layer(middleware::from_fn(csrf_protect))
        .layer(DefaultBodyLimit::max(MAX_BUFFERED_BODY))
}

/// Create the front-end routes: gated admin console plus static files.
pub fn frontend_routes(state: &AppState) -> Router<AppState> {
    let static_dir = &state.config().static_dir;
    let index = static_dir.join("index.html");

    let admin = Router::new()
        .route("/admin", get_service(ServeFile::new(&index)))
        .route("/admin/{*rest}", get_service(ServeFile::new(&index)))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate));

    admin.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
}

/// Create all routes for the gateway.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/csrf-token", get(csrf::issue))
        .route("/api/config", get(public_config))
        .nest("/api/session", session_routes())
        .nest("/api", proxy_routes())
        .merge(frontend_routes(state))
}

/// Settings the front-end bundle needs at runtime.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub site_url: String,
    pub google_client_id: Option<String>,
}

/// `GET /api/config`
async fn public_config(State(state): State<AppState>) -> Json<PublicConfig> {
    let config = state.config();
    Json(PublicConfig {
        site_url: config.site_url.clone(),
        google_client_id: config.google_client_id.clone(),
    })
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.backend().is_reachable().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
