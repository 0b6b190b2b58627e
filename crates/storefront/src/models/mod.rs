//! Session-held view models for the gateway.

pub mod session;

pub use session::{CartLineView, CartView, WishlistView, keys as session_keys};
