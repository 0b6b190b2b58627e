//! Core types for Maison.
//!
//! This module provides type-safe wrappers and client-held view models.

pub mod cart;
pub mod claims;
pub mod id;
pub mod price;
pub mod settings;
pub mod wishlist;

pub use cart::{Cart, CartError, CartItem, LineKey};
pub use claims::SessionClaims;
pub use id::*;
pub use price::{CurrencyCode, Language, Price, format_amount, format_price};
pub use settings::UserSettings;
pub use wishlist::{Wishlist, WishlistItem};
