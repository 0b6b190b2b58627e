//! Integration tests for session tokens, the admin who-am-I, and the admin page gate.

use maison_integration_tests::{
    ADMIN_TOKEN, FakeBackend, TEST_JWT_SECRET, USER_TOKEN, browser, in_one_hour, sign_token,
    spawn_gateway,
};
use reqwest::{StatusCode, header};
use serde_json::{Value, json};

#[tokio::test]
async fn test_me_requires_a_valid_token() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, Some(TEST_JWT_SECRET)).await;

    let resp = browser()
        .get(gateway.at("/api/session/me"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let token = sign_token(&json!({
        "id": "u1",
        "name": "Nour",
        "role": "user",
        "exp": in_one_hour(),
    }));
    let resp = browser()
        .get(gateway.at("/api/session/me"))
        .header(header::COOKIE, format!("token={token}"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    let claims: Value = resp.json().await.expect("json");
    assert_eq!(claims["id"], "u1");
    assert_eq!(claims["name"], "Nour");

    let forged = sign_token(&json!({"id": "u1", "exp": 1_000}));
    let resp = browser()
        .get(gateway.at("/api/session/me"))
        .bearer_auth(forged)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_without_secret_is_unauthorized() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let token = sign_token(&json!({"id": "u1", "exp": in_one_hour()}));
    let resp = browser()
        .get(gateway.at("/api/session/me"))
        .bearer_auth(token)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_whoami_asks_the_backend() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/api/session/admin"))
        .header(header::COOKIE, format!("token={ADMIN_TOKEN}"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.expect("json");
    assert_eq!(user["role"], "admin");
    assert_eq!(user["email"], "admin@maison.test");

    let resp = browser()
        .get(gateway.at("/api/session/admin"))
        .bearer_auth(USER_TOKEN)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["message"], "Not authorized as an admin");
}

#[tokio::test]
async fn test_admin_whoami_without_or_with_bad_token() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/api/session/admin"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.hits(), 0);

    let resp = browser()
        .get(gateway.at("/api/session/admin"))
        .bearer_auth("expired-or-garbage")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_admin_pages_redirect_without_admin_claims() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, Some(TEST_JWT_SECRET)).await;

    let resp = browser()
        .get(gateway.at("/admin/orders"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).expect("location"),
        "/login?redirect=%2Fadmin%2Forders"
    );

    let shopper = sign_token(&json!({"id": "u2", "role": "user", "exp": in_one_hour()}));
    let resp = browser()
        .get(gateway.at("/admin"))
        .header(header::COOKIE, format!("token={shopper}"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let admin = sign_token(&json!({"id": "u1", "role": "admin", "exp": in_one_hour()}));
    let resp = browser()
        .get(gateway.at("/admin/orders"))
        .header(header::COOKIE, format!("token={admin}"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("text").contains("maison"));
}

#[tokio::test]
async fn test_admin_pages_served_when_tokens_cannot_be_verified() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, None).await;

    let resp = browser()
        .get(gateway.at("/admin/products"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_proxy_does_not_gate_on_local_verification() {
    let backend = FakeBackend::spawn().await;
    let gateway = spawn_gateway(&backend.url, Some(TEST_JWT_SECRET)).await;

    // Opaque backend token: not a JWT the gateway can decode
    let resp = browser()
        .get(gateway.at("/api/auth/me"))
        .bearer_auth(ADMIN_TOKEN)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["user"]["role"], "admin");
}
