//! Integration tests for the backend reverse proxy.

use maison_integration_tests::{
    FakeBackend, PNG_BYTES, browser, fetch_csrf_token, raw_request, spawn_gateway,
    unreachable_url,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_unlisted_prefix_is_404_without_backend_call() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    for path in ["/api/internal/metrics", "/api/productsx/1", "/api/session-cart"] {
        let resp = browser().get(gateway.at(path)).send().await.expect("request");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
        let body: Value = resp.json().await.expect("json");
        assert!(body["message"].is_string(), "{path}");
    }

    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_dot_segments_cannot_reach_unlisted_prefix() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    for target in [
        "/api/products/../internal/metrics",
        "/api/products/%2e%2e/internal/metrics",
        "/api/orders/%2E%2E/internal/metrics?x=1",
        "/api/products/./../session",
    ] {
        assert_eq!(raw_request(&gateway, "GET", target).await, 404, "{target}");
    }

    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_dot_segments_within_a_prefix_are_relayed() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    assert_eq!(raw_request(&gateway, "GET", "/api/orders/o1/../o2").await, 201);
    assert_eq!(backend.requested_paths(), vec!["/api/orders/o2".to_string()]);
}

#[tokio::test]
async fn test_relays_status_headers_query_and_cookies() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;
    let client = browser();
    let token = fetch_csrf_token(&client, &gateway).await;

    let resp = client
        .put(gateway.at("/api/orders/o1/pay?method=card&retry=1"))
        .header("x-csrf-token", &token)
        .header("x-forwarded-for", "203.0.113.9")
        .json(&json!({"paid": true}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers().get("x-backend").expect("x-backend"), "fake");
    assert!(
        resp.headers()
            .get_all("set-cookie")
            .iter()
            .any(|v| v.to_str().is_ok_and(|c| c.starts_with("backend=1")))
    );

    let echoed: Value = resp.json().await.expect("json");
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["path"], "/api/orders/o1/pay");
    assert_eq!(echoed["query"], "method=card&retry=1");
    assert_eq!(echoed["contentType"], "application/json");
    assert_eq!(echoed["body"], r#"{"paid":true}"#);
    // Only allow-listed request headers are forwarded
    assert_eq!(echoed["forwardedFor"], Value::Null);
    assert!(
        echoed["cookie"]
            .as_str()
            .is_some_and(|c| c.contains(&format!("csrfToken={token}")))
    );
}

#[tokio::test]
async fn test_token_cookie_forwarded_as_bearer() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = reqwest::Client::new()
        .get(gateway.at("/api/orders/mine"))
        .header("cookie", "token=abc.def.ghi")
        .send()
        .await
        .expect("request");

    let echoed: Value = resp.json().await.expect("json");
    assert_eq!(echoed["authorization"], "Bearer abc.def.ghi");
}

#[tokio::test]
async fn test_explicit_authorization_wins_over_cookie() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = reqwest::Client::new()
        .get(gateway.at("/api/orders"))
        .header("cookie", "token=from-cookie")
        .header("authorization", "Bearer from-header")
        .send()
        .await
        .expect("request");

    let echoed: Value = resp.json().await.expect("json");
    assert_eq!(echoed["authorization"], "Bearer from-header");
}

#[tokio::test]
async fn test_request_id_forwarded_and_echoed() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/api/orders"))
        .header("x-request-id", "req-1234")
        .send()
        .await
        .expect("request");

    assert_eq!(resp.headers().get("x-request-id").expect("request id"), "req-1234");
    let echoed: Value = resp.json().await.expect("json");
    assert_eq!(echoed["requestId"], "req-1234");
}

#[tokio::test]
async fn test_binary_body_relayed_unchanged() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/api/upload/image.png"))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").expect("type"), "image/png");
    assert_eq!(resp.bytes().await.expect("bytes").as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_invalid_json_from_backend_is_500() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/api/reviews/broken"))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["message"], "Service temporarily unavailable");
}

#[tokio::test]
async fn test_unreachable_backend_is_500() {
    let gateway = spawn_gateway(&unreachable_url().await, None).await;

    let resp = browser()
        .get(gateway.at("/api/products"))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["message"], "Service temporarily unavailable");

    let ready = browser()
        .get(gateway.at("/health/ready"))
        .send()
        .await
        .expect("request");
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser().get(gateway.at("/health")).send().await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-frame-options").expect("xfo"), "DENY");
    assert!(resp.headers().contains_key("content-security-policy"));
    assert!(resp.headers().contains_key("x-request-id"));

    let ready = browser()
        .get(gateway.at("/health/ready"))
        .send()
        .await
        .expect("request");
    assert_eq!(ready.status(), StatusCode::OK);

    let api = browser()
        .get(gateway.at("/api/orders"))
        .send()
        .await
        .expect("request");
    assert_eq!(api.headers().get("cache-control").expect("cache"), "no-store, max-age=0");
}

#[tokio::test]
async fn test_static_files_with_index_fallback() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let robots = browser()
        .get(gateway.at("/robots.txt"))
        .send()
        .await
        .expect("request");
    assert_eq!(robots.status(), StatusCode::OK);
    assert_eq!(robots.text().await.expect("text"), "User-agent: *");

    let spa = browser()
        .get(gateway.at("/products/linen-shirt"))
        .send()
        .await
        .expect("request");
    assert_eq!(spa.status(), StatusCode::OK);
    assert!(spa.text().await.expect("text").contains("maison"));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_public_config() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let body: Value = browser()
        .get(gateway.at("/api/config"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(body["siteUrl"], "http://localhost:3000");
    assert_eq!(body["googleClientId"], Value::Null);
}
