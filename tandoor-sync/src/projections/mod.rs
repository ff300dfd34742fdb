//! Read-only projections fed by the event bus

pub mod dashboard;
pub mod kitchen;

pub use dashboard::DashboardRefresher;
pub use kitchen::{KitchenBoard, KitchenTicket};
