//! Session-related types.
//!
//! The session holds who is signed in and what is in the cart. The cart keeps
//! only ids and quantities; prices are recomputed on every request.

use serde::{Deserialize, Serialize};

use bazaar_core::{ComboId, Email, ProductId, UserId};

/// Session-stored customer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: UserId,
    pub email: Email,
    pub name: String,
}

/// What a cart line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartItemRef {
    Product { product_id: ProductId },
    Combo { combo_id: ComboId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub item: CartItemRef,
    pub quantity: u32,
}

/// The cart as stored in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCart {
    pub items: Vec<CartItem>,
    pub coupon_code: Option<String>,
}

impl SessionCart {
    /// Add units of an item, merging with an existing line.
    pub fn add(&mut self, item: CartItemRef, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|line| line.item == item) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.items.push(CartItem { item, quantity }),
        }
    }

    /// Set the quantity of a line; zero removes it.
    ///
    /// Returns `false` if the item is not in the cart.
    pub fn set_quantity(&mut self, item: CartItemRef, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(item);
        }
        match self.items.iter_mut().find(|line| line.item == item) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if it was not present.
    pub fn remove(&mut self, item: CartItemRef) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.item != item);
        self.items.len() != before
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Products referenced directly by cart lines.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items
            .iter()
            .filter_map(|line| match line.item {
                CartItemRef::Product { product_id } => Some(product_id),
                CartItemRef::Combo { .. } => None,
            })
            .collect()
    }

    #[must_use]
    pub fn combo_ids(&self) -> Vec<ComboId> {
        self.items
            .iter()
            .filter_map(|line| match line.item {
                CartItemRef::Combo { combo_id } => Some(combo_id),
                CartItemRef::Product { .. } => None,
            })
            .collect()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for storing the cart.
    pub const CART: &str = "cart";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rice() -> CartItemRef {
        CartItemRef::Product {
            product_id: ProductId::new(1),
        }
    }

    fn festive_box() -> CartItemRef {
        CartItemRef::Combo {
            combo_id: ComboId::new(4),
        }
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = SessionCart::default();
        cart.add(rice(), 2);
        cart.add(rice(), 1);
        cart.add(festive_box(), 1);
        cart.add(festive_box(), 0);
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items.first().unwrap().quantity, 3);
        assert_eq!(cart.product_ids(), vec![ProductId::new(1)]);
        assert_eq!(cart.combo_ids(), vec![ComboId::new(4)]);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = SessionCart::default();
        cart.add(rice(), 2);
        assert!(cart.set_quantity(rice(), 5));
        assert_eq!(cart.items.first().unwrap().quantity, 5);
        assert!(!cart.set_quantity(festive_box(), 1));
        assert!(cart.set_quantity(rice(), 0));
        assert!(cart.is_empty());
        assert!(!cart.remove(rice()));
    }

    #[test]
    fn test_item_json_shape() {
        let item: CartItem =
            serde_json::from_str(r#"{"type":"combo","combo_id":4,"quantity":2}"#).unwrap();
        assert_eq!(item.item, festive_box());
        assert_eq!(item.quantity, 2);
    }
}
