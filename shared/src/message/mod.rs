//! Event bus message types
//!
//! Payloads carried by the in-process event bus. Each payload holds only what
//! subscribers need (ids, table number, new status or amount), never a whole
//! session snapshot.
//!
//! | Channel | Payload |
//! |---------|---------|
//! | `order-status-changed` | [`OrderStatusChanged`] |
//! | `dashboard-batch-update` | [`DashboardBatchUpdate`] |
//! | `customer-notification` | [`CustomerNotification`] |
//! | `cash-payment-requested` | [`CashPaymentRequested`] |
//! | `payment-confirmed` | [`PaymentConfirmed`] |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Order, OrderItem, OrderStatus};
use crate::util::{de_id, de_opt_id};

/// Bus channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    OrderStatusChanged,
    DashboardBatchUpdate,
    CustomerNotification,
    CashPaymentRequested,
    PaymentConfirmed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderStatusChanged => "order-status-changed",
            EventKind::DashboardBatchUpdate => "dashboard-batch-update",
            EventKind::CustomerNotification => "customer-notification",
            EventKind::CashPaymentRequested => "cash-payment-requested",
            EventKind::PaymentConfirmed => "payment-confirmed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusChanged {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub table_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
}

impl OrderStatusChanged {
    /// Status event for the order's current state, stamped now
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            status: order.status,
            timestamp: Utc::now(),
            table_number: order.table_number,
            customer_phone: order.customer_phone.clone(),
        }
    }
}

/// Periodic full refresh for dashboards
///
/// Consumers derive priority from `generated_at` rather than their own clock
/// so every projection built from one batch agrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBatchUpdate {
    pub orders: Vec<Order>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerNotification {
    pub table_number: u32,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashPaymentRequested {
    #[serde(deserialize_with = "de_id")]
    pub request_id: String,
    pub table_number: u32,
    pub customer_phone: String,
    pub total: i64,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmed {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub request_id: Option<String>,
    pub customer_phone: String,
    pub table_number: u32,
}

// ============================================================================
// Event
// ============================================================================

/// Discriminated bus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    OrderStatusChanged(OrderStatusChanged),
    DashboardBatchUpdate(DashboardBatchUpdate),
    CustomerNotification(CustomerNotification),
    CashPaymentRequested(CashPaymentRequested),
    PaymentConfirmed(PaymentConfirmed),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::OrderStatusChanged(_) => EventKind::OrderStatusChanged,
            Event::DashboardBatchUpdate(_) => EventKind::DashboardBatchUpdate,
            Event::CustomerNotification(_) => EventKind::CustomerNotification,
            Event::CashPaymentRequested(_) => EventKind::CashPaymentRequested,
            Event::PaymentConfirmed(_) => EventKind::PaymentConfirmed,
        }
    }

    /// Table the event concerns, if it concerns exactly one
    pub fn table_number(&self) -> Option<u32> {
        match self {
            Event::OrderStatusChanged(e) => Some(e.table_number),
            Event::DashboardBatchUpdate(_) => None,
            Event::CustomerNotification(e) => Some(e.table_number),
            Event::CashPaymentRequested(e) => Some(e.table_number),
            Event::PaymentConfirmed(e) => Some(e.table_number),
        }
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Event {
                fn from(payload: $variant) -> Self {
                    Event::$variant(payload)
                }
            }
        )*
    };
}

impl_from_payload!(
    OrderStatusChanged,
    DashboardBatchUpdate,
    CustomerNotification,
    CashPaymentRequested,
    PaymentConfirmed,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = Event::from(PaymentConfirmed {
            request_id: Some("pay-1".to_string()),
            customer_phone: "9876543210".to_string(),
            table_number: 5,
        });
        assert_eq!(event.kind(), EventKind::PaymentConfirmed);
        assert_eq!(event.table_number(), Some(5));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "payment-confirmed");
        assert_eq!(value["payload"]["tableNumber"], 5);
        assert_eq!(value["payload"]["requestId"], "pay-1");

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_notification_type_field() {
        let note = CustomerNotification {
            table_number: 3,
            message: "Your order is ready".to_string(),
            kind: NotificationKind::Success,
        };
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["type"], "success");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EventKind::DashboardBatchUpdate.to_string(), "dashboard-batch-update");
        let json = serde_json::to_string(&EventKind::CashPaymentRequested).unwrap();
        assert_eq!(json, "\"cash-payment-requested\"");
    }
}
