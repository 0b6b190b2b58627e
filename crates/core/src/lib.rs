//! Maison Core - Shared domain types.
//!
//! This crate provides the view-model types used by the storefront gateway
//! and its clients:
//! - `storefront` - Gateway in front of the backend API
//! - `cli` - Gateway client and command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no session storage. Users, products, and orders are owned by the
//! backend; everything here is a short-lived, denormalized copy for rendering.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, price formatting, cart, wishlist, settings, and
//!   session claims

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
