//! Status, table and priority projections over orders
//!
//! Pure functions; priority is derived on read from `(timestamp, now)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shared::models::{Order, OrderStatus, Priority, PriorityThresholds};

/// Priority of an order at `now` (default thresholds: 15 and 30 minutes)
pub fn derive_priority(order: &Order, now: DateTime<Utc>) -> Priority {
    order.priority(now)
}

pub fn filter_by_status(orders: &[Order], status: OrderStatus) -> Vec<Order> {
    orders
        .iter()
        .filter(|o| o.status == status)
        .cloned()
        .collect()
}

pub fn filter_by_table(orders: &[Order], table_number: u32) -> Vec<Order> {
    orders
        .iter()
        .filter(|o| o.table_number == table_number)
        .cloned()
        .collect()
}

pub fn filter_by_priority(
    orders: &[Order],
    priority: Priority,
    now: DateTime<Utc>,
    thresholds: &PriorityThresholds,
) -> Vec<Order> {
    orders
        .iter()
        .filter(|o| o.priority_with(now, thresholds) == priority)
        .cloned()
        .collect()
}

pub fn group_by_status(orders: &[Order]) -> BTreeMap<OrderStatus, Vec<Order>> {
    let mut groups: BTreeMap<OrderStatus, Vec<Order>> = BTreeMap::new();
    for order in orders {
        groups.entry(order.status).or_default().push(order.clone());
    }
    groups
}

pub fn group_by_table(orders: &[Order]) -> BTreeMap<u32, Vec<Order>> {
    let mut groups: BTreeMap<u32, Vec<Order>> = BTreeMap::new();
    for order in orders {
        groups
            .entry(order.table_number)
            .or_default()
            .push(order.clone());
    }
    groups
}

/// Open orders only; served and cancelled ones carry no urgency
pub fn group_by_priority(
    orders: &[Order],
    now: DateTime<Utc>,
    thresholds: &PriorityThresholds,
) -> BTreeMap<Priority, Vec<Order>> {
    let mut groups: BTreeMap<Priority, Vec<Order>> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.is_open()) {
        groups
            .entry(order.priority_with(now, thresholds))
            .or_default()
            .push(order.clone());
    }
    groups
}
