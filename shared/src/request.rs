//! External API request/response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Order, OrderItem, OrderStatus, PaymentStatus, TableSession};
use crate::util::{de_id, de_opt_id};

/// `POST /sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub table_number: u32,
    pub customer_name: String,
    pub guest_count: u32,
}

/// Line of `POST /sessions/{sessionId}/orders`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderItem {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub item_id: Option<String>,
    pub name: String,
    pub quantity: u32,
    pub price: i64,
}

impl From<&OrderItem> for SubmitOrderItem {
    fn from(item: &OrderItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.price,
        }
    }
}

/// `POST /sessions/{sessionId}/orders`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    pub items: Vec<SubmitOrderItem>,
    pub total: i64,
}

impl From<&Order> for SubmitOrderRequest {
    fn from(order: &Order) -> Self {
        Self {
            items: order.items.iter().map(SubmitOrderItem::from).collect(),
            total: order.total,
        }
    }
}

/// Response of `POST /sessions/{sessionId}/orders`
///
/// The server echoes the whole updated session; clients replace their
/// projection with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    #[serde(deserialize_with = "de_id")]
    pub order_id: String,
    pub session: TableSession,
}

/// `PATCH /orders/{orderId}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// `POST /payment-requests`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub table_number: u32,
    pub customer_phone: String,
    pub total: i64,
    pub items: Vec<OrderItem>,
}

/// Response of `POST /payment-requests/{id}/confirm`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAck {
    #[serde(deserialize_with = "de_id")]
    pub request_id: String,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}
