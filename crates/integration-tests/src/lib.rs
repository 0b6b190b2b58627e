//! Test harness for the Maison gateway.
//!
//! Every test spins up a fake backend and a real gateway on ephemeral ports
//! and talks to the gateway over HTTP with `reqwest`, the way the browser
//! bundle does.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p maison-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Request, State},
    http::{HeaderMap, HeaderName, Method, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use maison_storefront::{AppState, app, config::StorefrontConfig};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

/// Secret shared by the gateway and [`sign_token`].
pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789-abcdefghij";

/// Opaque bearer token the fake backend treats as an admin.
pub const ADMIN_TOKEN: &str = "admin-token";

/// Opaque bearer token the fake backend treats as a regular user.
pub const USER_TOKEN: &str = "user-token";

/// Body served for `GET /api/upload/image.png`.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

/// Contents of the front-end `index.html` served by test gateways.
pub const INDEX_HTML: &str = "<!doctype html><title>maison</title>";

// =============================================================================
// Fake backend
// =============================================================================

#[derive(Clone, Default)]
struct BackendState {
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    stock: Arc<Mutex<HashMap<String, i64>>>,
}

/// A stand-in for the backend API.
pub struct FakeBackend {
    pub url: Url,
    state: BackendState,
}

impl FakeBackend {
    /// Start the fake backend on an ephemeral port.
    ///
    /// Products: `p1` (100, stock 3, wrapped response) and `p2` (1250.5,
    /// stock 10, bare response). Anything else is a 404.
    pub async fn spawn() -> Self {
        let state = BackendState::default();
        {
            let mut stock = state.stock.lock().expect("stock lock");
            stock.insert("p1".to_string(), 3);
            stock.insert("p2".to_string(), 10);
        }

        let app = Router::new()
            .route("/", get(|| async { "backend" }))
            .route("/api/products/{id}", get(product))
            .route("/api/auth/me", get(auth_me))
            .route("/api/auth/{*rest}", any(echo))
            .route("/api/orders", any(echo))
            .route("/api/orders/{*rest}", any(echo))
            .route("/api/newsletter", any(echo))
            .route("/api/internal/{*rest}", any(echo))
            .route("/api/upload/image.png", get(image))
            .route("/api/reviews/broken", get(broken_json))
            .layer(middleware::from_fn_with_state(state.clone(), count_hits))
            .with_state(state.clone());

        let url = serve(app.into_make_service_with_connect_info::<SocketAddr>()).await;
        Self { url, state }
    }

    /// Number of requests the backend has received.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Paths the backend has received, in order.
    #[must_use]
    pub fn requested_paths(&self) -> Vec<String> {
        self.state.paths.lock().expect("paths lock").clone()
    }

    /// Change a product's stock.
    pub fn set_stock(&self, product_id: &str, stock: i64) {
        self.state
            .stock
            .lock()
            .expect("stock lock")
            .insert(product_id.to_string(), stock);
    }

    /// Make a product unknown to the backend.
    pub fn remove_product(&self, product_id: &str) {
        self.state.stock.lock().expect("stock lock").remove(product_id);
    }
}

async fn count_hits(State(state): State<BackendState>, request: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .paths
        .lock()
        .expect("paths lock")
        .push(request.uri().path().to_string());
    next.run(request).await
}

async fn product(State(state): State<BackendState>, Path(id): Path<String>) -> Response {
    let stock = state.stock.lock().expect("stock lock").get(&id).copied();
    match (id.as_str(), stock) {
        ("p1", Some(stock)) => Json(json!({
            "product": {
                "_id": "p1",
                "name": "Linen Shirt",
                "price": 100,
                "countInStock": stock,
                "images": ["/img/p1.jpg"],
                "slug": "linen-shirt",
            }
        }))
        .into_response(),
        ("p2", Some(stock)) => Json(json!({
            "_id": "p2",
            "name": "Silk Scarf",
            "price": 1250.5,
            "countInStock": stock,
            "image": "/img/p2.jpg",
        }))
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Product not found" })),
        )
            .into_response(),
    }
}

async fn auth_me(headers: HeaderMap) -> Response {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match bearer {
        Some(ADMIN_TOKEN) => Json(json!({
            "user": {"_id": "u-admin", "name": "Admin", "email": "admin@maison.test", "role": "admin"}
        }))
        .into_response(),
        Some(USER_TOKEN) => Json(json!({
            "_id": "u-user", "name": "Shopper", "email": "shopper@maison.test", "role": "user"
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Not authorized, token failed" })),
        )
            .into_response(),
    }
}

/// Echo what the backend received.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    (
        StatusCode::CREATED,
        [
            (header::SET_COOKIE, "backend=1; Path=/"),
            (HeaderName::from_static("x-backend"), "fake"),
        ],
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "authorization": get("authorization"),
            "csrf": get("x-csrf-token"),
            "contentType": get("content-type"),
            "cookie": get("cookie"),
            "requestId": get("x-request-id"),
            "forwardedFor": get("x-forwarded-for"),
            "body": String::from_utf8_lossy(&body),
        })),
    )
        .into_response()
}

async fn image() -> Response {
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES).into_response()
}

async fn broken_json() -> Response {
    ([(header::CONTENT_TYPE, "application/json")], "{not json").into_response()
}

// =============================================================================
// Gateway
// =============================================================================

/// A running gateway.
pub struct TestGateway {
    pub url: Url,
    pub static_dir: PathBuf,
}

impl TestGateway {
    /// Absolute URL for a gateway path.
    #[must_use]
    pub fn at(&self, path: &str) -> String {
        format!("{}{}", self.url.as_str().trim_end_matches('/'), path)
    }
}

/// Start a gateway in front of `backend`, optionally with a token secret.
pub async fn spawn_gateway(backend: &Url, jwt_secret: Option<&str>) -> TestGateway {
    let static_dir = std::env::temp_dir().join(format!("maison-static-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&static_dir).expect("create static dir");
    std::fs::write(static_dir.join("index.html"), INDEX_HTML).expect("write index.html");
    std::fs::write(static_dir.join("robots.txt"), "User-agent: *").expect("write robots.txt");

    let mut config = StorefrontConfig::with_backend(backend.clone());
    config.jwt_secret = jwt_secret.map(|s| SecretString::from(s.to_string()));
    config.static_dir.clone_from(&static_dir);

    let state = AppState::new(config).expect("gateway state");
    let url = serve(app(state).into_make_service_with_connect_info::<SocketAddr>()).await;
    TestGateway { url, static_dir }
}

async fn serve(
    make_service: axum::extract::connect_info::IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, make_service).await.expect("server");
    });
    format!("http://{addr}/").parse().expect("server url")
}

/// A URL nothing is listening on.
pub async fn unreachable_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/").parse().expect("unreachable url")
}

// =============================================================================
// Client helpers
// =============================================================================

/// Send a request line as-is over TCP and return the response status.
///
/// HTTP clients normalize dot segments before sending; this does not.
pub async fn raw_request(gateway: &TestGateway, method: &str, target: &str) -> u16 {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let host = gateway.url.host_str().expect("gateway host");
    let port = gateway.url.port().expect("gateway port");
    let mut stream = tokio::net::TcpStream::connect((host, port))
        .await
        .expect("connect to gateway");

    let request =
        format!("{method} {target} HTTP/1.1\r\nHost: {host}:{port}\r\nConnection: close\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read response");

    String::from_utf8_lossy(&response)
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status code")
}

/// Browser-like client: keeps cookies, does not follow redirects.
#[must_use]
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Fetch a CSRF token; the cookie lands in the client's store.
pub async fn fetch_csrf_token(client: &reqwest::Client, gateway: &TestGateway) -> String {
    let body: Value = client
        .get(gateway.at("/api/csrf-token"))
        .send()
        .await
        .expect("csrf-token request")
        .json()
        .await
        .expect("csrf-token body");
    body["csrfToken"]
        .as_str()
        .expect("csrfToken field")
        .to_string()
}

/// Sign a token with [`TEST_JWT_SECRET`].
#[must_use]
pub fn sign_token(claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("sign token")
}

/// Expiry one hour from now.
#[must_use]
pub fn in_one_hour() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        + 3600
}
