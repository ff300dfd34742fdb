//! Kitchen board
//!
//! Read-only projection built from bus events. Status events update single
//! tickets, dashboard batches replace the board.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::message::{DashboardBatchUpdate, OrderStatusChanged};
use shared::models::{Order, OrderItem, OrderStatus, Priority, PriorityThresholds};
use shared::util::canonical_id;

use crate::message::{EventBus, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitchenTicket {
    pub order_id: String,
    pub table_number: u32,
    pub status: OrderStatus,
    /// Order time once a batch carried the order; until then the time of
    /// the first status event seen
    pub placed_at: DateTime<Utc>,
    /// Empty until a batch carried the full order
    pub items: Vec<OrderItem>,
}

impl KitchenTicket {
    fn from_order(order: &Order) -> Self {
        Self {
            order_id: canonical_id(&order.id),
            table_number: order.table_number,
            status: order.status,
            placed_at: order.timestamp,
            items: order.items.clone(),
        }
    }

    pub fn priority(&self, now: DateTime<Utc>, thresholds: &PriorityThresholds) -> Priority {
        thresholds.classify(now - self.placed_at)
    }
}

type Tickets = Arc<Mutex<HashMap<String, KitchenTicket>>>;

fn apply_status(tickets: &Tickets, event: &OrderStatusChanged) {
    let id = canonical_id(&event.id);
    let mut tickets = tickets.lock();
    match tickets.get_mut(&id) {
        Some(ticket) if ticket.status.can_transition_to(event.status) => {
            ticket.status = event.status;
        }
        Some(ticket) => {
            tracing::debug!(
                order_id = %ticket.order_id,
                current = %ticket.status,
                reported = %event.status,
                "Late status event ignored"
            );
        }
        None => {
            tickets.insert(
                id.clone(),
                KitchenTicket {
                    order_id: id,
                    table_number: event.table_number,
                    status: event.status,
                    placed_at: event.timestamp,
                    items: Vec::new(),
                },
            );
        }
    }
}

fn apply_batch(tickets: &Tickets, batch: &DashboardBatchUpdate) {
    let fresh: HashMap<String, KitchenTicket> = batch
        .orders
        .iter()
        .map(KitchenTicket::from_order)
        .map(|t| (t.order_id.clone(), t))
        .collect();
    *tickets.lock() = fresh;
}

pub struct KitchenBoard {
    tickets: Tickets,
    thresholds: PriorityThresholds,
    subscriptions: Vec<Subscription>,
}

impl KitchenBoard {
    pub fn attach(bus: &EventBus, thresholds: PriorityThresholds) -> Self {
        let tickets: Tickets = Arc::default();

        let on_status = {
            let tickets = Arc::clone(&tickets);
            bus.order_status().subscribe(move |e| apply_status(&tickets, e))
        };
        let on_batch = {
            let tickets = Arc::clone(&tickets);
            bus.dashboard().subscribe(move |e| apply_batch(&tickets, e))
        };

        Self {
            tickets,
            thresholds,
            subscriptions: vec![on_status, on_batch],
        }
    }

    /// Open tickets, oldest first
    pub fn queue(&self) -> Vec<KitchenTicket> {
        let mut open: Vec<KitchenTicket> = self
            .tickets
            .lock()
            .values()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            a.placed_at
                .cmp(&b.placed_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        open
    }

    pub fn by_status(&self, status: OrderStatus) -> Vec<KitchenTicket> {
        self.queue_all()
            .into_iter()
            .filter(|t| t.status == status)
            .collect()
    }

    /// Open tickets at `priority` as of `now`
    pub fn by_priority(&self, priority: Priority, now: DateTime<Utc>) -> Vec<KitchenTicket> {
        self.queue()
            .into_iter()
            .filter(|t| t.priority(now, &self.thresholds) == priority)
            .collect()
    }

    pub fn ticket(&self, order_id: &str) -> Option<KitchenTicket> {
        self.tickets.lock().get(&canonical_id(order_id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.tickets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn queue_all(&self) -> Vec<KitchenTicket> {
        let mut all: Vec<KitchenTicket> = self.tickets.lock().values().cloned().collect();
        all.sort_by(|a, b| a.placed_at.cmp(&b.placed_at));
        all
    }

    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}
