//! Visitor wishlist, deduplicated by product id.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A saved product with the fields needed to render it without a backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    items: Vec<WishlistItem>,
}

impl Wishlist {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.product_id == product_id)
    }

    /// Add an item unless the product is already saved.
    ///
    /// Returns `true` if the item was inserted.
    pub fn add(&mut self, item: WishlistItem) -> bool {
        if self.contains(&item.product_id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Returns `true` if an item was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        self.items.len() != before
    }

    /// Remove the product if saved, add it otherwise.
    ///
    /// Returns `true` if the product is saved after the call.
    pub fn toggle(&mut self, item: WishlistItem) -> bool {
        if self.remove(&item.product_id) {
            false
        } else {
            self.items.push(item);
            true
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dress() -> WishlistItem {
        WishlistItem {
            product_id: ProductId::new("dress-7"),
            name: "Pleated Midi Dress".to_string(),
            price: Decimal::new(1_250, 0),
            image: Some("/img/dress-7.jpg".to_string()),
            slug: Some("pleated-midi-dress".to_string()),
        }
    }

    #[test]
    fn test_add_twice_keeps_one_entry() {
        let mut wishlist = Wishlist::new();
        assert!(wishlist.add(dress()));
        assert!(!wishlist.add(dress()));
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_toggle() {
        let mut wishlist = Wishlist::new();
        assert!(wishlist.toggle(dress()));
        assert!(wishlist.contains(&ProductId::new("dress-7")));
        assert!(!wishlist.toggle(dress()));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut wishlist = Wishlist::new();
        wishlist.add(dress());
        assert!(wishlist.remove(&ProductId::new("dress-7")));
        assert!(!wishlist.remove(&ProductId::new("dress-7")));
    }
}
