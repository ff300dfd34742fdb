//! Table Session Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Order;
use crate::util::de_id;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

/// One continuous dining occupancy of a table (堂食会话)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSession {
    #[serde(deserialize_with = "de_id")]
    pub session_id: String,
    pub table_number: u32,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub guest_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub status: SessionStatus,
    /// Submission order
    #[serde(default)]
    pub orders: Vec<Order>,
    /// Σ order totals
    #[serde(default)]
    pub total_amount: i64,
}

impl TableSession {
    pub fn new(
        session_id: impl Into<String>,
        table_number: u32,
        customer_name: impl Into<String>,
        guest_count: u32,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            table_number,
            customer_name: customer_name.into(),
            guest_count,
            phone_number: None,
            start_time: Utc::now(),
            status: SessionStatus::Active,
            orders: Vec::new(),
            total_amount: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Σ of the contained orders' totals
    pub fn orders_total(&self) -> i64 {
        self.orders
            .iter()
            .fold(0_i64, |acc, order| acc.saturating_add(order.total))
    }

    /// Re-derive `total_amount`. Returns `true` if it changed.
    pub fn recompute_total(&mut self) -> bool {
        let total = self.orders_total();
        let changed = total != self.total_amount;
        self.total_amount = total;
        changed
    }
}
