//! Backend response types used by the gateway's own routes.
//!
//! The backend wraps single entities inconsistently (`{"product": {...}}` vs a
//! bare object), so both shapes are accepted.

use maison_core::{CartItem, ProductId, UserId, WishlistItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The subset of a backend product needed to price and stock-check a cart line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    /// Units in stock; the backend may report negatives after oversells.
    #[serde(alias = "countInStock", default)]
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl ProductSummary {
    /// Stock clamped to the range a cart understands.
    #[must_use]
    pub fn available(&self) -> u32 {
        u32::try_from(self.stock.max(0)).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<String> {
        self.image.clone().or_else(|| self.images.first().cloned())
    }

    /// Build a cart line for this product.
    #[must_use]
    pub fn to_cart_item(
        &self,
        size: Option<String>,
        color: Option<String>,
        quantity: u32,
    ) -> CartItem {
        CartItem {
            product_id: self.id.clone(),
            name: self.name.clone(),
            image: self.primary_image(),
            size,
            color,
            quantity,
            price: self.price,
            stock: self.available(),
        }
    }

    #[must_use]
    pub fn to_wishlist_item(&self) -> WishlistItem {
        WishlistItem {
            product_id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.primary_image(),
            slug: self.slug.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductEnvelope {
    Wrapped { product: ProductSummary },
    Bare(ProductSummary),
}

impl ProductEnvelope {
    pub(crate) fn into_inner(self) -> ProductSummary {
        match self {
            Self::Wrapped { product } | Self::Bare(product) => product,
        }
    }
}

/// The authenticated user as reported by the backend.
///
/// Unknown fields are kept so the full profile can be relayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUser {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_role() -> String {
    "user".to_string()
}

impl BackendUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UserEnvelope {
    Wrapped { user: BackendUser },
    Bare(BackendUser),
}

impl UserEnvelope {
    pub(crate) fn into_inner(self) -> BackendUser {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}
