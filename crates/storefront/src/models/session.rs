//! Session-related types.
//!
//! Cart, wishlist, and display settings are stored per visitor in the
//! session. Views add prices formatted for the visitor's settings.

use maison_core::{Cart, CartItem, CurrencyCode, Language, Price, UserSettings, Wishlist, WishlistItem};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use tower_sessions::Session;

/// Session keys for visitor state.
pub mod keys {
    /// Key for the visitor's cart.
    pub const CART: &str = "cart";

    /// Key for the visitor's wishlist.
    pub const WISHLIST: &str = "wishlist";

    /// Key for language and currency settings.
    pub const SETTINGS: &str = "userSettings";
}

/// Load a value from the session, falling back to its default when absent.
///
/// A stored value that no longer deserializes is treated as absent.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load<T>(session: &Session, key: &str) -> Result<T, tower_sessions::session::Error>
where
    T: DeserializeOwned + Default,
{
    match session.get::<T>(key).await {
        Ok(value) => Ok(value.unwrap_or_default()),
        Err(tower_sessions::session::Error::SerdeJson(e)) => {
            tracing::warn!(key, error = %e, "Discarding unreadable session value");
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

/// Store a value in the session, replacing any previous value.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized or the store fails.
pub async fn store<T>(
    session: &Session,
    key: &str,
    value: &T,
) -> Result<(), tower_sessions::session::Error>
where
    T: Serialize + Send + Sync,
{
    session.insert(key, value).await
}

// =============================================================================
// Views
// =============================================================================

fn display(amount: Decimal, settings: UserSettings) -> String {
    Price::new(amount, settings.currency).display(settings.language)
}

/// A cart line with display prices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    #[serde(flatten)]
    pub item: CartItem,
    pub line_total: Decimal,
    pub price_display: String,
    pub line_total_display: String,
}

/// The cart as returned to the browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub subtotal_display: String,
    pub currency: CurrencyCode,
    pub language: Language,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, settings: UserSettings) -> Self {
        let items = cart
            .items()
            .iter()
            .map(|item| CartLineView {
                line_total: item.line_total(),
                price_display: display(item.price, settings),
                line_total_display: display(item.line_total(), settings),
                item: item.clone(),
            })
            .collect();

        Self {
            items,
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            subtotal_display: display(cart.subtotal(), settings),
            currency: settings.currency,
            language: settings.language,
        }
    }
}

/// A wishlist entry with a display price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemView {
    #[serde(flatten)]
    pub item: WishlistItem,
    pub price_display: String,
}

/// The wishlist as returned to the browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    pub items: Vec<WishlistItemView>,
    pub count: usize,
}

impl WishlistView {
    #[must_use]
    pub fn new(wishlist: &Wishlist, settings: UserSettings) -> Self {
        Self {
            items: wishlist
                .items()
                .iter()
                .map(|item| WishlistItemView {
                    price_display: display(item.price, settings),
                    item: item.clone(),
                })
                .collect(),
            count: wishlist.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use maison_core::ProductId;

    use super::*;

    fn item(price: &str, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new("p1"),
            name: "Linen Shirt".to_string(),
            image: None,
            size: Some("M".to_string()),
            color: None,
            quantity,
            price: price.parse().unwrap(),
            stock: 10,
        }
    }

    #[test]
    fn test_cart_view_formats_for_settings() {
        let mut cart = Cart::new();
        cart.add(item("1250.5", 2)).unwrap();

        let view = CartView::new(&cart, UserSettings::default());
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal_display, "EGP 2,501");
        assert_eq!(view.items[0].price_display, "EGP 1,250.5");

        let arabic = UserSettings {
            language: Language::Ar,
            currency: CurrencyCode::EGP,
        };
        let view = CartView::new(&cart, arabic);
        assert_eq!(view.subtotal_display, "2,501 ج.م");
    }

    #[test]
    fn test_cart_view_with_extreme_price() {
        let mut cart = Cart::new();
        let mut line = item("1", 9);
        line.price = Decimal::MAX;
        cart.add(line).unwrap();

        let view = CartView::new(&cart, UserSettings::default());
        assert_eq!(view.subtotal, Decimal::MAX);
        assert!(view.subtotal_display.starts_with("EGP 79,228,162,514"));
    }

    #[test]
    fn test_cart_view_serializes_flat() {
        let mut cart = Cart::new();
        cart.add(item("10", 1)).unwrap();
        let json = serde_json::to_value(CartView::new(&cart, UserSettings::default())).unwrap();

        let line = &json["items"][0];
        assert_eq!(line["productId"], "p1");
        assert_eq!(line["size"], "M");
        assert_eq!(line["lineTotalDisplay"], "EGP 10");
        assert_eq!(json["itemCount"], 1);
    }

    #[test]
    fn test_empty_wishlist_view() {
        let view = WishlistView::new(&Wishlist::new(), UserSettings::default());
        assert_eq!(view.count, 0);
        assert!(view.items.is_empty());
    }
}
