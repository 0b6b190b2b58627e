//! Maison gateway client library.
//!
//! [`GatewayClient`] talks to the storefront gateway the way the browser
//! bundle does: it keeps the gateway's cookies, caches the CSRF token, and
//! echoes it on state-changing calls.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;

pub use client::{AdminIdentity, ApiResponse, ClientError, ClientOptions, GatewayClient};
