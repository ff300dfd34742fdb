//! Reconciliation of server snapshots into the registry
//!
//! The server is authoritative. A snapshot replaces the table's session
//! wholesale: its orders become confirmed entries, optimistic entries are
//! dropped. When the snapshot answers a specific submission the matching
//! provisional entry is the one it replaces; a snapshot that answers nothing
//! we have pending is a conflict, logged and applied as a full overwrite.

use std::collections::HashSet;

use shared::models::{Order, TableSession};
use shared::util::{canonical_id, same_id};
use uuid::Uuid;

use super::registry::{SessionRegistry, SyncedOrder, TableState};
use crate::utils::SyncResult;

/// Submission a snapshot is answering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Correlation id of the provisional entry
    pub correlation_id: Uuid,
    /// Server-assigned id of the confirmed order
    pub order_id: String,
}

/// What a reconciliation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Session view after the replace
    pub session: TableSession,
    /// The confirmed order, when a confirmation was supplied and found
    pub confirmed: Option<Order>,
    /// Provisional entries dropped without a confirmation
    pub discarded_pending: usize,
    /// Repeated order ids collapsed from the snapshot
    pub duplicates_dropped: usize,
    /// The confirmation did not match local pending state
    pub conflict: bool,
    /// The snapshot belongs to a different session than the local one
    pub superseded: bool,
}

/// Snapshot orders, first occurrence of each canonical id kept
fn dedup_orders(table_number: u32, orders: Vec<Order>) -> (Vec<Order>, usize) {
    let mut seen = HashSet::with_capacity(orders.len());
    let mut kept = Vec::with_capacity(orders.len());
    let mut dropped = 0;
    for mut order in orders {
        order.id = canonical_id(&order.id);
        if !seen.insert(order.id.clone()) {
            dropped += 1;
            continue;
        }
        if order.table_number != table_number {
            tracing::warn!(
                order_id = %order.id,
                table_number,
                reported = order.table_number,
                "Snapshot order reports a different table, using the session's"
            );
            order.table_number = table_number;
        }
        if order.recompute_total() {
            tracing::warn!(
                order_id = %order.id,
                total = order.total,
                "Order total disagreed with its items, recomputed"
            );
        }
        kept.push(order);
    }
    (kept, dropped)
}

impl SessionRegistry {
    /// Seed a table from a fetched session, e.g. on join or refresh
    pub fn seed(&self, snapshot: TableSession) -> SyncResult<ReconcileOutcome> {
        self.reconcile(snapshot, None)
    }

    /// Replace the table's state with a server snapshot
    pub fn reconcile(
        &self,
        mut snapshot: TableSession,
        confirmation: Option<Confirmation>,
    ) -> SyncResult<ReconcileOutcome> {
        let table_number = snapshot.table_number;
        self.check_table(table_number)?;

        snapshot.session_id = canonical_id(&snapshot.session_id);
        let reported_total = snapshot.total_amount;
        let (orders, duplicates_dropped) =
            dedup_orders(table_number, std::mem::take(&mut snapshot.orders));

        let confirmed = confirmation.as_ref().and_then(|c| {
            orders
                .iter()
                .find(|o| same_id(&o.id, &c.order_id))
                .cloned()
        });

        let (outcome, view) = {
            let mut tables = self.tables.lock();
            let previous = tables.get(&table_number);

            let superseded = previous
                .is_some_and(|state| !same_id(&state.session.session_id, &snapshot.session_id));
            // The phone is captured locally and never sent with the session
            if !superseded && snapshot.phone_number.is_none() {
                snapshot.phone_number = previous.and_then(|state| state.session.phone_number.clone());
            }
            let pending: Vec<Uuid> = previous
                .map(|state| {
                    state
                        .entries
                        .iter()
                        .filter_map(SyncedOrder::correlation_id)
                        .collect()
                })
                .unwrap_or_default();

            let matched = confirmation
                .as_ref()
                .is_some_and(|c| pending.contains(&c.correlation_id));
            let replaced = matched && confirmed.is_some();
            let conflict = confirmation.is_some() && !replaced;
            let discarded_pending = pending.len() - usize::from(replaced);

            let entries = orders.into_iter().map(SyncedOrder::Confirmed).collect();
            let state = TableState::new(snapshot, entries);
            let view = state.view();
            tables.insert(table_number, state);

            (
                ReconcileOutcome {
                    session: view.clone(),
                    confirmed,
                    discarded_pending,
                    duplicates_dropped,
                    conflict,
                    superseded,
                },
                view,
            )
        };

        if view.total_amount != reported_total {
            tracing::warn!(
                table_number,
                reported = reported_total,
                computed = view.total_amount,
                "Session total disagreed with its orders, recomputed"
            );
        }
        if outcome.duplicates_dropped > 0 {
            tracing::warn!(
                table_number,
                dropped = outcome.duplicates_dropped,
                "Snapshot contained repeated orders"
            );
        }
        if outcome.discarded_pending > 0 {
            tracing::warn!(
                table_number,
                discarded = outcome.discarded_pending,
                "Unconfirmed local orders dropped by server snapshot"
            );
        }
        if outcome.conflict {
            tracing::warn!(
                table_number,
                session_id = %view.session_id,
                "Server snapshot did not match pending submission, overwriting"
            );
        }
        if outcome.superseded {
            tracing::info!(
                table_number,
                session_id = %view.session_id,
                "Local session superseded by server session"
            );
        }
        tracing::debug!(
            table_number,
            orders = view.orders.len(),
            total_amount = view.total_amount,
            "Session reconciled"
        );

        self.notify(table_number, &view);
        Ok(outcome)
    }

    /// Merge a server-reported order into whichever table holds it
    ///
    /// Returns the order as stored, or `None` when no table holds it. A copy
    /// whose status would move the stored order backwards is stale and is
    /// not applied.
    pub fn apply_order_update(&self, mut order: Order) -> Option<Order> {
        order.id = canonical_id(&order.id);
        order.recompute_total();

        let applied = {
            let mut tables = self.tables.lock();
            tables.iter_mut().find_map(|(number, state)| {
                let entry = state
                    .entries
                    .iter_mut()
                    .find(|e| same_id(&e.order().id, &order.id))?;
                let current = entry.order();
                if !current.status.can_transition_to(order.status) {
                    return Some((*number, current.clone(), None));
                }
                order.table_number = *number;
                *entry = SyncedOrder::Confirmed(order.clone());
                Some((*number, order.clone(), Some(state.view())))
            })
        };

        match applied {
            Some((table_number, stored, Some(view))) => {
                tracing::debug!(
                    table_number,
                    order_id = %stored.id,
                    status = %stored.status,
                    "Order update applied"
                );
                self.notify(table_number, &view);
                Some(stored)
            }
            Some((table_number, stored, None)) => {
                tracing::warn!(
                    table_number,
                    order_id = %stored.id,
                    current = %stored.status,
                    reported = %order.status,
                    "Stale order update ignored"
                );
                Some(stored)
            }
            None => {
                tracing::debug!(order_id = %order.id, "Order update for unknown order ignored");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{CartLine, build_order};
    use chrono::Utc;
    use parking_lot::Mutex;
    use shared::models::{OrderItem, OrderStatus};
    use std::sync::Arc;

    fn server_order(id: &str, table_number: u32, quantity: u32, price: i64) -> Order {
        Order {
            id: id.to_string(),
            table_number,
            items: vec![OrderItem {
                name: "Butter Naan".to_string(),
                item_id: Some("1".to_string()),
                quantity,
                price,
            }],
            total: i64::from(quantity) * price,
            status: OrderStatus::Pending,
            timestamp: Utc::now(),
            customer_phone: None,
            estimated_time: None,
        }
    }

    fn snapshot(session_id: &str, table_number: u32, orders: Vec<Order>) -> TableSession {
        let mut session = TableSession::new(session_id, table_number, "Asha", 2);
        session.orders = orders;
        session.recompute_total();
        session
    }

    #[test]
    fn test_seed_empty_session() {
        let registry = SessionRegistry::new(20);
        let outcome = registry.seed(snapshot("500", 5, vec![])).unwrap();
        assert!(!outcome.superseded);
        assert_eq!(outcome.session.total_amount, 0);
        assert!(!registry.is_available(5));
    }

    #[test]
    fn test_confirmation_replaces_provisional_entry() {
        let registry = SessionRegistry::new(20);
        registry.seed(snapshot("500", 5, vec![])).unwrap();

        let order = build_order(5, &[CartLine::new("1", "Butter Naan", 2, 45)]).unwrap();
        let (correlation_id, _) = registry.insert_pending(5, order).unwrap();
        assert_eq!(registry.get_session(5).unwrap().total_amount, 90);

        let outcome = registry
            .reconcile(
                snapshot("500", 5, vec![server_order("1000", 5, 2, 45)]),
                Some(Confirmation {
                    correlation_id,
                    order_id: "1000".to_string(),
                }),
            )
            .unwrap();

        assert!(!outcome.conflict);
        assert_eq!(outcome.discarded_pending, 0);
        assert_eq!(outcome.confirmed.unwrap().id, "1000");

        let session = registry.get_session(5).unwrap();
        assert_eq!(session.orders.len(), 1);
        assert_eq!(session.total_amount, 90);
        assert_eq!(registry.pending_count(5), 0);
    }

    #[test]
    fn test_snapshot_duplicates_collapse() {
        let registry = SessionRegistry::new(20);
        let outcome = registry
            .seed(snapshot(
                "500",
                5,
                vec![
                    server_order("1000", 5, 2, 45),
                    server_order("1000", 5, 2, 45),
                    server_order("001000", 5, 2, 45),
                    server_order("1001", 5, 1, 280),
                ],
            ))
            .unwrap();

        assert_eq!(outcome.duplicates_dropped, 2);
        let session = registry.get_session(5).unwrap();
        assert_eq!(session.orders.len(), 2);
        assert_eq!(session.total_amount, 370);
    }

    #[test]
    fn test_unmatched_confirmation_is_conflict() {
        let registry = SessionRegistry::new(20);
        registry.seed(snapshot("500", 5, vec![])).unwrap();

        let outcome = registry
            .reconcile(
                snapshot("500", 5, vec![server_order("1000", 5, 1, 45)]),
                Some(Confirmation {
                    correlation_id: Uuid::new_v4(),
                    order_id: "1000".to_string(),
                }),
            )
            .unwrap();

        assert!(outcome.conflict);
        assert_eq!(registry.get_session(5).unwrap().orders.len(), 1);
    }

    #[test]
    fn test_local_only_orders_dropped_by_snapshot() {
        let registry = SessionRegistry::new(20);
        registry.seed(snapshot("500", 5, vec![])).unwrap();
        registry
            .add_order_to_session(5, &[CartLine::local("Chai", 1, 30)])
            .unwrap();

        let outcome = registry.seed(snapshot("500", 5, vec![])).unwrap();
        assert_eq!(outcome.discarded_pending, 1);
        assert!(registry.get_session(5).unwrap().orders.is_empty());
    }

    #[test]
    fn test_new_server_session_supersedes() {
        let registry = SessionRegistry::new(20);
        registry.seed(snapshot("500", 5, vec![server_order("1000", 5, 1, 45)])).unwrap();

        let outcome = registry.seed(snapshot("501", 5, vec![])).unwrap();
        assert!(outcome.superseded);
        let session = registry.get_session(5).unwrap();
        assert_eq!(session.session_id, "501");
        assert!(session.orders.is_empty());
    }

    #[test]
    fn test_snapshot_totals_are_recomputed() {
        let registry = SessionRegistry::new(20);
        let mut wrong = server_order("1000", 5, 2, 45);
        wrong.total = 10;
        let mut session = snapshot("500", 5, vec![wrong]);
        session.total_amount = 999;

        let outcome = registry.seed(session).unwrap();
        assert_eq!(outcome.session.orders[0].total, 90);
        assert_eq!(outcome.session.total_amount, 90);
    }

    #[test]
    fn test_reconcile_notifies_subscribers_once() {
        let registry = SessionRegistry::new(20);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        registry.subscribe(5, move |session| s.lock().push(session.total_amount));

        registry
            .seed(snapshot("500", 5, vec![server_order("1000", 5, 2, 45)]))
            .unwrap();
        assert_eq!(*seen.lock(), vec![90]);
    }

    #[test]
    fn test_apply_order_update() {
        let registry = SessionRegistry::new(20);
        registry
            .seed(snapshot("500", 5, vec![server_order("1000", 5, 2, 45)]))
            .unwrap();

        let mut ready = server_order("01000", 0, 2, 45);
        ready.status = OrderStatus::Ready;
        let applied = registry.apply_order_update(ready).unwrap();
        assert_eq!(applied.status, OrderStatus::Ready);

        let stored = registry.find_order("1000").unwrap();
        assert_eq!(stored.status, OrderStatus::Ready);
        assert_eq!(stored.table_number, 5);
        assert_eq!(registry.get_session(5).unwrap().orders.len(), 1);

        assert!(registry.apply_order_update(server_order("4242", 5, 1, 45)).is_none());
    }

    #[test]
    fn test_stale_order_update_does_not_regress() {
        let registry = SessionRegistry::new(20);
        let mut served = server_order("1000", 5, 2, 45);
        served.status = OrderStatus::Served;
        registry.seed(snapshot("500", 5, vec![served])).unwrap();

        let hits = Arc::new(Mutex::new(0));
        let h = Arc::clone(&hits);
        registry.subscribe(5, move |_| *h.lock() += 1);

        let mut late = server_order("1000", 5, 2, 45);
        late.status = OrderStatus::Preparing;
        let stored = registry.apply_order_update(late).unwrap();

        assert_eq!(stored.status, OrderStatus::Served);
        assert_eq!(registry.find_order("1000").unwrap().status, OrderStatus::Served);
        assert_eq!(*hits.lock(), 0);

        // Cancelling a served order is still refused
        let mut cancelled = server_order("1000", 5, 2, 45);
        cancelled.status = OrderStatus::Cancelled;
        let stored = registry.apply_order_update(cancelled).unwrap();
        assert_eq!(stored.status, OrderStatus::Served);
    }

    #[test]
    fn test_phone_survives_snapshot_of_same_session() {
        let registry = SessionRegistry::new(20);
        registry.seed(snapshot("500", 5, vec![])).unwrap();
        registry.update_session_phone(5, "9876543210").unwrap();

        registry
            .seed(snapshot("500", 5, vec![server_order("1000", 5, 1, 45)]))
            .unwrap();
        assert_eq!(
            registry.get_session(5).unwrap().phone_number.as_deref(),
            Some("9876543210")
        );

        // A phone reported by the server wins
        let mut reported = snapshot("500", 5, vec![]);
        reported.phone_number = Some("9123456780".to_string());
        registry.seed(reported).unwrap();
        assert_eq!(
            registry.get_session(5).unwrap().phone_number.as_deref(),
            Some("9123456780")
        );

        // A different session starts without one
        registry.seed(snapshot("501", 5, vec![])).unwrap();
        assert!(registry.get_session(5).unwrap().phone_number.is_none());
    }

    #[test]
    fn test_confirmation_after_several_local_entries() {
        let registry = SessionRegistry::new(20);
        registry.seed(snapshot("500", 5, vec![])).unwrap();
        registry
            .add_order_to_session(5, &[CartLine::local("Chai", 1, 30)])
            .unwrap();
        registry
            .add_order_to_session(5, &[CartLine::local("Lassi", 1, 60)])
            .unwrap();

        let order = build_order(5, &[CartLine::new("1", "Butter Naan", 2, 45)]).unwrap();
        let (correlation_id, _) = registry.insert_pending(5, order).unwrap();
        assert_eq!(registry.pending_count(5), 3);

        let outcome = registry
            .reconcile(
                snapshot("500", 5, vec![server_order("1000", 5, 2, 45)]),
                Some(Confirmation {
                    correlation_id,
                    order_id: "1000".to_string(),
                }),
            )
            .unwrap();

        assert!(!outcome.conflict);
        assert_eq!(outcome.discarded_pending, 2);
        let session = registry.get_session(5).unwrap();
        assert_eq!(session.orders.len(), 1);
        assert_eq!(session.orders[0].id, "1000");
        assert_eq!(session.total_amount, 90);
        assert_eq!(registry.pending_count(5), 0);
    }
}
