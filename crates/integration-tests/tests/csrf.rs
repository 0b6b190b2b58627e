//! Integration tests for double-submit CSRF protection.

use maison_integration_tests::{FakeBackend, browser, fetch_csrf_token, spawn_gateway};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_csrf_token_endpoint_sets_readable_cookie() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/api/csrf-token"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("csrfToken="))
        .expect("csrfToken cookie")
        .to_string();
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("HttpOnly"));
    // Site URL is plain http in tests
    assert!(!cookie.contains("Secure"));

    let body: Value = resp.json().await.expect("json");
    let token = body["csrfToken"].as_str().expect("token");
    assert_eq!(token.len(), 43);
    assert!(cookie.starts_with(&format!("csrfToken={token}")));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_post_without_token_is_rejected_before_backend() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .post(gateway.at("/api/orders"))
        .json(&json!({"items": []}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["message"], "Invalid CSRF token");
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_cookie_without_submitted_token_is_rejected() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;
    let client = browser();
    fetch_csrf_token(&client, &gateway).await;

    let resp = client
        .delete(gateway.at("/api/orders/o1"))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_mismatched_token_is_rejected() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;
    let client = browser();
    let token = fetch_csrf_token(&client, &gateway).await;

    // Same length, last character changed
    let mut forged = token[..token.len() - 1].to_string();
    forged.push(if token.ends_with('A') { 'B' } else { 'A' });

    let resp = client
        .post(gateway.at("/api/orders"))
        .header("x-csrf-token", forged)
        .json(&json!({}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_matching_header_token_reaches_backend() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;
    let client = browser();
    let token = fetch_csrf_token(&client, &gateway).await;

    let resp = client
        .post(gateway.at("/api/orders"))
        .header("x-csrf-token", &token)
        .json(&json!({"items": [{"product": "p1", "qty": 1}]}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::CREATED);
    let echoed: Value = resp.json().await.expect("json");
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["csrf"], token.as_str());
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_urlencoded_body_field_token_is_accepted() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;
    let client = browser();
    let token = fetch_csrf_token(&client, &gateway).await;

    let resp = client
        .post(gateway.at("/api/newsletter"))
        .form(&[("email", "a@maison.test"), ("_csrf", token.as_str())])
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::CREATED);
    let echoed: Value = resp.json().await.expect("json");
    let body = echoed["body"].as_str().expect("body");
    assert!(body.contains("email=a%40maison.test"));
    assert!(body.contains("_csrf="));
}

#[tokio::test]
async fn test_safe_methods_skip_the_check() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/api/orders?mine=1"))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_session_mutations_require_token() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .post(gateway.at("/api/session/cart/items"))
        .json(&json!({"productId": "p1"}))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(backend.hits(), 0);
}
