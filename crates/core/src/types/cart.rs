//! Visitor cart.
//!
//! The cart is a denormalized copy of product data (price, stock) taken when
//! items are added. The backend remains authoritative; the cart only enforces
//! that a line never asks for more units than the last-known stock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;

/// Errors from cart mutations. A failed mutation leaves the cart unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The requested quantity would exceed the known stock.
    #[error("Only {available} item(s) available in stock")]
    StockLimit {
        /// Units in stock at the time of the last refresh.
        available: u32,
    },

    /// The product has no stock at all.
    #[error("This item is out of stock")]
    OutOfStock,

    /// A quantity of zero was requested where at least one unit is required.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// No line matches the given product, size, and color.
    #[error("Item not found in cart")]
    ItemNotFound,
}

/// Identifies a cart line: the same product in a different size or color is a
/// separate line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub quantity: u32,
    /// Unit price at the time of the last refresh.
    pub price: Decimal,
    /// Units in stock at the time of the last refresh.
    pub stock: u32,
}

impl CartItem {
    /// The key identifying this item's line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// Unit price multiplied by quantity, saturating at the decimal range.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.matches(key))
    }

    /// Add an item, merging with an existing line for the same product, size,
    /// and color.
    ///
    /// The incoming item's price and stock replace the cached values on an
    /// existing line.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `item.quantity` is zero
    /// - `OutOfStock` if `item.stock` is zero
    /// - `StockLimit` if the merged quantity would exceed `item.stock`
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if item.stock == 0 {
            return Err(CartError::OutOfStock);
        }

        let key = item.key();
        let existing = self.get(&key).map_or(0, |line| line.quantity);
        let requested = existing.saturating_add(item.quantity);
        if requested > item.stock {
            return Err(CartError::StockLimit {
                available: item.stock,
            });
        }

        match self.items.iter_mut().find(|line| line.matches(&key)) {
            Some(line) => {
                line.quantity = requested;
                line.price = item.price;
                line.stock = item.stock;
                line.name = item.name;
                line.image = item.image;
            }
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if there is no such line
    /// - `StockLimit` if `quantity` exceeds the line's known stock
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<(), CartError> {
        let index = self.position(key).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 {
            self.items.remove(index);
            return Ok(());
        }

        let line = self
            .items
            .get_mut(index)
            .ok_or(CartError::ItemNotFound)?;
        if quantity > line.stock {
            return Err(CartError::StockLimit {
                available: line.stock,
            });
        }
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a single unit. Removing the last unit removes the line.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if there is no such line.
    pub fn decrement(&mut self, key: &LineKey) -> Result<(), CartError> {
        let index = self.position(key).ok_or(CartError::ItemNotFound)?;
        let remaining = self
            .items
            .get(index)
            .map_or(0, |line| line.quantity.saturating_sub(1));
        if remaining == 0 {
            self.items.remove(index);
        } else if let Some(line) = self.items.get_mut(index) {
            line.quantity = remaining;
        }
        Ok(())
    }

    /// Remove a line entirely. Returns whether a line was removed.
    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.items.len();
        self.items.retain(|item| !item.matches(key));
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Update cached price and stock for every line of a product.
    ///
    /// Quantities are clamped down to the new stock; lines for a product that
    /// is now out of stock are dropped. Returns the number of lines whose
    /// quantity was reduced or removed.
    pub fn refresh_product(&mut self, product_id: &ProductId, price: Decimal, stock: u32) -> usize {
        let mut adjusted = 0;
        self.items.retain_mut(|line| {
            if &line.product_id != product_id {
                return true;
            }
            line.price = price;
            line.stock = stock;
            if line.quantity > stock {
                line.quantity = stock;
                adjusted += 1;
            }
            line.quantity > 0
        });
        adjusted
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |total, item| total.saturating_add(item.line_total()))
    }

    fn position(&self, key: &LineKey) -> Option<usize> {
        self.items.iter().position(|item| item.matches(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tee(quantity: u32, stock: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new("tee-1"),
            name: "Linen Tee".to_string(),
            image: None,
            size: Some("M".to_string()),
            color: Some("Sand".to_string()),
            quantity,
            price: Decimal::new(45_000, 2),
            stock,
        }
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let mut cart = Cart::new();
        let mut huge = tee(1_000, u32::MAX);
        huge.price = Decimal::MAX;
        cart.add(huge.clone()).unwrap();
        huge.size = Some("L".to_string());
        huge.quantity = u32::MAX;
        cart.add(huge).unwrap();

        assert_eq!(cart.items().first().unwrap().line_total(), Decimal::MAX);
        assert_eq!(cart.subtotal(), Decimal::MAX);
        assert_eq!(cart.item_count(), u32::MAX);
    }

    #[test]
    fn test_add_merges_same_line() {
        let mut cart = Cart::new();
        cart.add(tee(1, 5)).unwrap();
        cart.add(tee(2, 5)).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_different_size_is_new_line() {
        let mut cart = Cart::new();
        cart.add(tee(1, 5)).unwrap();

        let mut large = tee(1, 5);
        large.size = Some("L".to_string());
        cart.add(large).unwrap();

        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_add_over_stock_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        cart.add(tee(2, 3)).unwrap();
        let before = cart.clone();

        let err = cart.add(tee(2, 3)).unwrap_err();

        assert_eq!(err, CartError::StockLimit { available: 3 });
        assert_eq!(cart, before);
    }

    #[test]
    fn test_add_rejects_zero_quantity_and_zero_stock() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(tee(0, 3)), Err(CartError::InvalidQuantity));
        assert_eq!(cart.add(tee(1, 0)), Err(CartError::OutOfStock));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_decrement_last_unit_removes_line() {
        let mut cart = Cart::new();
        cart.add(tee(2, 5)).unwrap();
        let key = tee(1, 5).key();

        cart.decrement(&key).unwrap();
        assert_eq!(cart.get(&key).unwrap().quantity, 1);

        cart.decrement(&key).unwrap();
        assert!(cart.get(&key).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new();
        cart.add(tee(1, 4)).unwrap();
        let key = tee(1, 4).key();

        cart.set_quantity(&key, 4).unwrap();
        assert_eq!(cart.item_count(), 4);

        assert_eq!(
            cart.set_quantity(&key, 5),
            Err(CartError::StockLimit { available: 4 })
        );
        assert_eq!(cart.item_count(), 4);

        cart.set_quantity(&key, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_missing_line_errors() {
        let mut cart = Cart::new();
        let key = tee(1, 1).key();
        assert_eq!(cart.decrement(&key), Err(CartError::ItemNotFound));
        assert_eq!(cart.set_quantity(&key, 1), Err(CartError::ItemNotFound));
        assert!(!cart.remove(&key));
    }

    #[test]
    fn test_refresh_product_clamps_to_stock() {
        let mut cart = Cart::new();
        cart.add(tee(4, 5)).unwrap();

        let adjusted = cart.refresh_product(&ProductId::new("tee-1"), Decimal::new(400, 0), 2);

        assert_eq!(adjusted, 1);
        let line = cart.get(&tee(1, 1).key()).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.price, Decimal::new(400, 0));

        cart.refresh_product(&ProductId::new("tee-1"), Decimal::new(400, 0), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal() {
        let mut cart = Cart::new();
        cart.add(tee(2, 5)).unwrap();
        assert_eq!(cart.subtotal(), Decimal::new(900, 0));
    }
}
