//! Error handling
//!
//! | Class | Type | Policy |
//! |-------|------|--------|
//! | Validation | [`ValidationError`] | rejected before any mutation |
//! | Network | [`SyncError::Network`] | local state left as it was, error propagated |
//! | Reconciliation conflict | `ReconcileOutcome::conflict` | full-session overwrite, not an error |
//! | Repeated confirmation | `ConfirmOutcome::AlreadySettled` | success, not an error |

use shared::models::{InvalidTransition, OrderStatus};
use tandoor_client::ClientError;
use thiserror::Error;

/// Input rejected before it reached any state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Phone number must be exactly 10 digits: {0:?}")]
    InvalidPhone(String),

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Quantity must be positive for {name:?} (got {quantity})")]
    NonPositiveQuantity { name: String, quantity: i64 },

    #[error("Price must not be negative for {name:?} (got {price})")]
    NegativePrice { name: String, price: i64 },

    #[error("Lines for {name:?} disagree on unit price ({first} vs {second})")]
    PriceMismatch { name: String, first: i64, second: i64 },

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Table number {table_number} is outside 1..={max_tables}")]
    InvalidTable { table_number: u32, max_tables: u32 },

    #[error("Customer name must not be empty")]
    EmptyCustomerName,

    #[error("Item name must not be empty")]
    EmptyItemName,

    #[error("A phone number is required for table {0}")]
    MissingPhone(u32),
}

/// Synchronization core error
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("No active session for table {0}")]
    NoActiveSession(u32),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid status transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Network failure: {0}")]
    Network(#[from] ClientError),
}

impl SyncError {
    pub(crate) fn transition(order_id: impl Into<String>, err: InvalidTransition) -> Self {
        SyncError::InvalidTransition {
            order_id: order_id.into(),
            from: err.from,
            to: err.to,
        }
    }

    /// Whether the user can retry the same action
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
