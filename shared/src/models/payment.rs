//! Cash Payment Request Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OrderItem;
use crate::util::de_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
}

/// Cash settlement requested from a table, confirmed by staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashPaymentRequest {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub table_number: u32,
    pub customer_phone: String,
    pub total: i64,
    /// Item snapshot at request time
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub status: PaymentStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl CashPaymentRequest {
    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }

    /// Mark confirmed. Returns `false` if it already was.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_confirmed() {
            return false;
        }
        self.status = PaymentStatus::Confirmed;
        self.confirmed_at = Some(at);
        true
    }
}
