//! Order Model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{de_id, de_opt_id};

// ============================================================================
// Order Status
// ============================================================================

/// Kitchen-facing order status
///
/// ```text
/// pending ──▶ preparing ──▶ ready ──▶ served
///    │            │           │
///    └────────────┴───────────┴──────▶ cancelled
/// ```
///
/// Forward skips (pending → served) are allowed, regressions are not.
/// `served` and `cancelled` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Position on the forward track; cancelled is off-track
    fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Preparing => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Served => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Served | OrderStatus::Cancelled)
    }

    /// Whether `self -> next` is a legal move. Staying put is legal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Validated transition
    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Rejected status move (e.g. served → pending)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid order status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

// ============================================================================
// Priority
// ============================================================================

/// Urgency label derived from order age
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Priority for an order placed at `timestamp`, using the default thresholds
    pub fn derive(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        PriorityThresholds::default().classify(now - timestamp)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => f.write_str("low"),
            Priority::Medium => f.write_str("medium"),
            Priority::High => f.write_str("high"),
        }
    }
}

/// Age thresholds for priority derivation
///
/// `elapsed < medium_after` is low, `elapsed > high_after` is high,
/// everything in between (inclusive) is medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityThresholds {
    pub medium_after: Duration,
    pub high_after: Duration,
}

impl PriorityThresholds {
    pub fn from_minutes(medium: i64, high: i64) -> Self {
        Self {
            medium_after: Duration::minutes(medium),
            high_after: Duration::minutes(high.max(medium)),
        }
    }

    pub fn classify(&self, elapsed: Duration) -> Priority {
        if elapsed < self.medium_after {
            Priority::Low
        } else if elapsed <= self.high_after {
            Priority::Medium
        } else {
            Priority::High
        }
    }
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self::from_minutes(15, 30)
    }
}

// ============================================================================
// Order
// ============================================================================

/// One line of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Display name
    pub name: String,
    /// Catalog reference, absent on purely local lines
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_id: Option<String>,
    pub quantity: u32,
    /// Unit price snapshot taken at order time
    pub price: i64,
}

impl OrderItem {
    /// `price × quantity`, `None` on overflow
    pub fn line_total(&self) -> Option<i64> {
        self.price.checked_mul(i64::from(self.quantity))
    }
}

/// One kitchen-facing submission within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub table_number: u32,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    /// Kitchen estimate in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
}

impl Order {
    /// Σ price × quantity, `None` on overflow
    pub fn items_total(&self) -> Option<i64> {
        self.items
            .iter()
            .try_fold(0_i64, |acc, item| acc.checked_add(item.line_total()?))
    }

    /// Re-derive `total` from the items. Returns `true` if it changed.
    pub fn recompute_total(&mut self) -> bool {
        match self.items_total() {
            Some(total) if total != self.total => {
                self.total = total;
                true
            }
            _ => false,
        }
    }

    pub fn priority(&self, now: DateTime<Utc>) -> Priority {
        Priority::derive(self.timestamp, now)
    }

    pub fn priority_with(&self, now: DateTime<Utc>, thresholds: &PriorityThresholds) -> Priority {
        thresholds.classify(now - self.timestamp)
    }

    /// Still on the kitchen's plate
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}
