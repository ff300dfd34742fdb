//! Shared types for Tandoor
//!
//! Data model, bus event payloads and wire DTOs used by both the HTTP
//! client and the synchronization core.

pub mod message;
pub mod models;
pub mod request;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{
    CashPaymentRequested, CustomerNotification, DashboardBatchUpdate, Event, EventKind,
    NotificationKind, OrderStatusChanged, PaymentConfirmed,
};
pub use models::{
    CashPaymentRequest, InvalidTransition, Order, OrderItem, OrderStatus, PaymentStatus,
    Priority, PriorityThresholds, SessionStatus, TableSession,
};
