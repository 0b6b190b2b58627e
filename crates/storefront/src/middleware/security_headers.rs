//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! The front-end bundle needs Google sign-in (script and iframe) and product
//! images from arbitrary HTTPS hosts; everything else stays locked to `'self'`.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// CSP for the storefront and admin console.
///
/// ```text
/// default-src 'self';
/// script-src 'self' https://accounts.google.com;
/// style-src 'self' 'unsafe-inline' https://accounts.google.com;
/// img-src 'self' data: blob: https:;
/// font-src 'self' data:;
/// connect-src 'self' https://accounts.google.com;
/// frame-src https://accounts.google.com;
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self'; \
     script-src 'self' https://accounts.google.com; \
     style-src 'self' 'unsafe-inline' https://accounts.google.com; \
     img-src 'self' data: blob: https:; \
     font-src 'self' data:; \
     connect-src 'self' https://accounts.google.com; \
     frame-src https://accounts.google.com; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'";

/// Add security headers to all responses.
///
/// API responses (`/api/*`) are additionally marked `no-store` since they
/// carry per-visitor data. Headers already set by the backend are kept.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_api = request.uri().path().starts_with("/api/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), microphone=(), geolocation=(), usb=(), \
             interest-cohort=(), browsing-topics=()",
        ),
    );
    // Google sign-in popups need to talk back to the opener
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    if is_api && !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    response
}
