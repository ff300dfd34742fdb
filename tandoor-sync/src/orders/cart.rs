//! Table-side cart
//!
//! Local edits before submission. The cart survives failed submissions and is
//! only cleared once the server has confirmed the order built from it.

use shared::models::Order;

use super::aggregator::{CartLine, LineKey, build_order, merge_lines};
use crate::utils::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line, summing quantities with an existing line for the same item
    ///
    /// One unit price per item: the price of the latest addition applies to
    /// the whole line.
    pub fn add(&mut self, line: CartLine) {
        let key = line.key();
        match self.lines.iter_mut().find(|l| l.key() == key) {
            Some(existing) => {
                if existing.price != line.price {
                    tracing::debug!(
                        item = %existing.name,
                        old_price = existing.price,
                        new_price = line.price,
                        "Cart line repriced"
                    );
                    existing.price = line.price;
                }
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => self.lines.push(line),
        }
    }

    /// Set the quantity of the line matching `item` (catalog id or name).
    /// A non-positive quantity removes the line. Returns `false` if no line
    /// matched.
    pub fn set_quantity(&mut self, item: &str, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(item);
        }
        match self.position(item) {
            Some(pos) => {
                self.lines[pos].quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, item: &str) -> bool {
        match self.position(item) {
            Some(pos) => {
                self.lines.remove(pos);
                true
            }
            None => false,
        }
    }

    fn position(&self, item: &str) -> Option<usize> {
        let by_id = LineKey::of(Some(item), "");
        let by_name = LineKey::of(None, item);
        self.lines
            .iter()
            .position(|l| l.key() == by_id)
            .or_else(|| self.lines.iter().position(|l| l.key() == by_name))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Σ price × quantity of valid lines
    pub fn subtotal(&self) -> Result<i64, ValidationError> {
        super::aggregator::items_total(&merge_lines(&self.lines)?)
    }

    /// Build a provisional order without touching the cart
    pub fn to_order(&self, table_number: u32) -> Result<Order, ValidationError> {
        build_order(table_number, &self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_same_item() {
        let mut cart = Cart::new();
        cart.add(CartLine::new("1", "Butter Naan", 1, 45));
        cart.add(CartLine::new("1", "Butter Naan", 2, 45));
        cart.add(CartLine::local("Jaljeera", 1, 60));
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.subtotal().unwrap(), 3 * 45 + 60);
    }

    #[test]
    fn test_add_reprices_whole_line() {
        let mut cart = Cart::new();
        cart.add(CartLine::new("1", "Naan", 1, 45));
        cart.add(CartLine::new("1", "Naan", 1, 50));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].price, 50);

        // Order total matches what the cart shows
        let order = cart.to_order(5).unwrap();
        assert_eq!(order.total, cart.subtotal().unwrap());
        assert_eq!(order.total, 100);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::new();
        cart.add(CartLine::new("1", "Butter Naan", 1, 45));
        cart.add(CartLine::local("Jaljeera", 1, 60));

        assert!(cart.set_quantity("1", 4));
        assert!(cart.set_quantity("jaljeera", 2));
        assert_eq!(cart.subtotal().unwrap(), 4 * 45 + 2 * 60);

        assert!(cart.set_quantity("1", 0));
        assert_eq!(cart.len(), 1);
        assert!(!cart.remove("missing"));
    }

    #[test]
    fn test_to_order_leaves_cart_intact() {
        let mut cart = Cart::new();
        cart.add(CartLine::new("2", "Paneer Tikka", 1, 280));
        let order = cart.to_order(5).unwrap();
        assert_eq!(order.total, 280);
        assert_eq!(cart.len(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.to_order(5), Err(ValidationError::EmptyOrder));
    }
}
