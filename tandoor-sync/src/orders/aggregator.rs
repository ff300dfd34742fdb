//! Order aggregation
//!
//! Turns cart lines into an [`Order`]: validation, identity normalization
//! (repeated additions of one item become one line) and exact integer totals.
//! Tax and packaging fees are the caller's concern.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderItem, OrderStatus};
use shared::util::{canonical_id, snowflake_id};

use crate::utils::ValidationError;

/// A line as the table client collected it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    /// Unit price, integer currency units
    pub price: i64,
}

impl CartLine {
    /// Line for a catalog item
    pub fn new(item_id: impl Into<String>, name: impl Into<String>, quantity: i64, price: i64) -> Self {
        Self {
            item_id: Some(item_id.into()),
            name: name.into(),
            quantity,
            price,
        }
    }

    /// Line without a catalog reference (custom or not yet resolved)
    pub fn local(name: impl Into<String>, quantity: i64, price: i64) -> Self {
        Self {
            item_id: None,
            name: name.into(),
            quantity,
            price,
        }
    }

    pub(crate) fn key(&self) -> LineKey {
        LineKey::of(self.item_id.as_deref(), &self.name)
    }
}

/// Identity of a line within one order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum LineKey {
    Catalog(String),
    Name(String),
}

impl LineKey {
    pub(crate) fn of(item_id: Option<&str>, name: &str) -> Self {
        match item_id.map(canonical_id).filter(|id| !id.is_empty()) {
            Some(id) => LineKey::Catalog(id),
            None => LineKey::Name(normalize_name(name)),
        }
    }
}

/// Trimmed, whitespace-collapsed, lowercase
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn validate_line(line: &CartLine) -> Result<u32, ValidationError> {
    if line.name.trim().is_empty() && line.item_id.is_none() {
        return Err(ValidationError::EmptyItemName);
    }
    if line.quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity {
            name: line.name.clone(),
            quantity: line.quantity,
        });
    }
    if line.price < 0 {
        return Err(ValidationError::NegativePrice {
            name: line.name.clone(),
            price: line.price,
        });
    }
    u32::try_from(line.quantity).map_err(|_| ValidationError::AmountOverflow)
}

/// Validate every line, then merge lines sharing an identity
///
/// The first occurrence fixes the line's position and name. Lines of one item
/// must agree on the unit price.
pub fn merge_lines(lines: &[CartLine]) -> Result<Vec<OrderItem>, ValidationError> {
    let quantities = lines
        .iter()
        .map(validate_line)
        .collect::<Result<Vec<_>, _>>()?;

    let mut index: HashMap<LineKey, usize> = HashMap::with_capacity(lines.len());
    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());

    for (line, quantity) in lines.iter().zip(quantities) {
        match index.get(&line.key()) {
            Some(&pos) => {
                let item = &mut items[pos];
                if item.price != line.price {
                    return Err(ValidationError::PriceMismatch {
                        name: item.name.clone(),
                        first: item.price,
                        second: line.price,
                    });
                }
                item.quantity = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or(ValidationError::AmountOverflow)?;
            }
            None => {
                index.insert(line.key(), items.len());
                items.push(OrderItem {
                    name: line.name.trim().to_string(),
                    item_id: line.item_id.as_deref().map(canonical_id),
                    quantity,
                    price: line.price,
                });
            }
        }
    }

    Ok(items)
}

/// Exact Σ price × quantity
pub fn items_total(items: &[OrderItem]) -> Result<i64, ValidationError> {
    items.iter().try_fold(0_i64, |acc, item| {
        item.line_total()
            .and_then(|line| acc.checked_add(line))
            .ok_or(ValidationError::AmountOverflow)
    })
}

/// Build a provisional order for a table from cart lines
///
/// The id is a client-issued snowflake; it is replaced wholesale once the
/// server confirms the order.
pub fn build_order(table_number: u32, lines: &[CartLine]) -> Result<Order, ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyOrder);
    }
    let items = merge_lines(lines)?;
    let total = items_total(&items)?;

    Ok(Order {
        id: snowflake_id().to_string(),
        table_number,
        items,
        total,
        status: OrderStatus::Pending,
        timestamp: Utc::now(),
        customer_phone: None,
        estimated_time: None,
    })
}

/// Collapse items from several orders into a bill snapshot
///
/// Lines merge only when both identity and unit price match, since prices are
/// snapshots taken at each order's time.
pub fn consolidate_items<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> Vec<OrderItem> {
    let mut index: HashMap<(LineKey, i64), usize> = HashMap::new();
    let mut merged: Vec<OrderItem> = Vec::new();

    for item in items {
        let key = (LineKey::of(item.item_id.as_deref(), &item.name), item.price);
        match index.get(&key) {
            Some(&pos) => {
                merged[pos].quantity = merged[pos].quantity.saturating_add(item.quantity);
            }
            None => {
                index.insert(key, merged.len());
                merged.push(item.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_order_total() {
        let order = build_order(5, &[CartLine::new("1", "Butter Naan", 2, 45)]).unwrap();
        assert_eq!(order.total, 90);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.table_number, 5);
        assert_eq!(order.items_total(), Some(order.total));
    }

    #[test]
    fn test_same_item_id_merges() {
        let order = build_order(
            1,
            &[
                CartLine::new("1", "Butter Naan", 2, 45),
                CartLine::new("2", "Dal Makhani", 1, 220),
                CartLine::new("001", "Butter Naan", 3, 45),
            ],
        )
        .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].item_id.as_deref(), Some("1"));
        assert_eq!(order.items[0].quantity, 5);
        assert_eq!(order.total, 5 * 45 + 220);
    }

    #[test]
    fn test_local_lines_merge_by_normalized_name() {
        let items = merge_lines(&[
            CartLine::local("Masala  Chai", 1, 30),
            CartLine::local("  masala chai ", 2, 30),
        ])
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].name, "Masala  Chai");
    }

    #[test]
    fn test_catalog_and_local_lines_stay_apart() {
        let items = merge_lines(&[
            CartLine::new("7", "Lassi", 1, 80),
            CartLine::local("Lassi", 1, 80),
        ])
        .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_same_item_at_two_prices_rejected() {
        let err = build_order(
            5,
            &[
                CartLine::new("1", "Naan", 1, 45),
                CartLine::new("1", "Naan", 1, 50),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::PriceMismatch {
                name: "Naan".to_string(),
                first: 45,
                second: 50,
            }
        );
    }

    #[test]
    fn test_empty_order_rejected() {
        assert_eq!(build_order(1, &[]), Err(ValidationError::EmptyOrder));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        for quantity in [0, -2] {
            let err = build_order(1, &[CartLine::new("1", "Naan", quantity, 45)]).unwrap_err();
            assert!(matches!(err, ValidationError::NonPositiveQuantity { .. }));
        }
    }

    #[test]
    fn test_negative_price_and_overflow_rejected() {
        let err = build_order(1, &[CartLine::local("Refund", 1, -10)]).unwrap_err();
        assert!(matches!(err, ValidationError::NegativePrice { .. }));

        let err = build_order(1, &[CartLine::local("Gold leaf", 2, i64::MAX)]).unwrap_err();
        assert_eq!(err, ValidationError::AmountOverflow);
    }

    #[test]
    fn test_consolidate_keeps_price_snapshots_apart() {
        let first = build_order(1, &[CartLine::new("1", "Naan", 2, 45)]).unwrap();
        let second = build_order(1, &[CartLine::new("1", "Naan", 1, 45)]).unwrap();
        let repriced = build_order(1, &[CartLine::new("1", "Naan", 1, 50)]).unwrap();

        let bill = consolidate_items(
            first
                .items
                .iter()
                .chain(&second.items)
                .chain(&repriced.items),
        );
        assert_eq!(bill.len(), 2);
        assert_eq!(bill[0].quantity, 3);
        assert_eq!(bill[1].price, 50);
    }
}
