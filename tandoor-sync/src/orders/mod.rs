//! Orders: cart, aggregation and read-side views

pub mod aggregator;
pub mod cart;
pub mod views;

pub use aggregator::{CartLine, build_order, consolidate_items, items_total, merge_lines, normalize_name};
pub use cart::Cart;
pub use views::{
    derive_priority, filter_by_priority, filter_by_status, filter_by_table, group_by_priority,
    group_by_status, group_by_table,
};
