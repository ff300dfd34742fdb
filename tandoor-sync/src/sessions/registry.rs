//! Session registry
//!
//! Single source of truth for the table-facing client between server round
//! trips. One [`TableState`] per table number; each order inside it is either
//! an optimistic [`SyncedOrder::Pending`] entry or a server-confirmed one.
//!
//! Every mutation runs to completion under the table map lock, the lock is
//! released, and only then are the table's subscribers called with the new
//! session view. Subscribers may therefore query or mutate the registry.

use std::collections::HashMap;

use parking_lot::Mutex;
use shared::models::{Order, SessionStatus, TableSession};
use shared::util::same_id;
use uuid::Uuid;

use crate::message::{ListenerSet, Subscription};
use crate::orders::{CartLine, build_order};
use crate::utils::validation::{validate_customer_name, validate_phone, validate_table};
use crate::utils::{SyncError, SyncResult};

/// Order entry tracked by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncedOrder {
    /// Applied locally, not confirmed by the server. The correlation id ties
    /// it to the submission that will replace it.
    Pending { correlation_id: Uuid, order: Order },
    /// As the server last reported it
    Confirmed(Order),
}

impl SyncedOrder {
    pub fn order(&self) -> &Order {
        match self {
            SyncedOrder::Pending { order, .. } => order,
            SyncedOrder::Confirmed(order) => order,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SyncedOrder::Pending { .. })
    }

    pub fn correlation_id(&self) -> Option<Uuid> {
        match self {
            SyncedOrder::Pending { correlation_id, .. } => Some(*correlation_id),
            SyncedOrder::Confirmed(_) => None,
        }
    }
}

/// Per-table state. `session.orders` is left empty; orders live in
/// `entries` and are flattened by [`TableState::view`].
#[derive(Debug, Clone)]
pub(super) struct TableState {
    pub(super) session: TableSession,
    pub(super) entries: Vec<SyncedOrder>,
}

impl TableState {
    pub(super) fn new(mut session: TableSession, entries: Vec<SyncedOrder>) -> Self {
        session.orders.clear();
        Self { session, entries }
    }

    pub(super) fn view(&self) -> TableSession {
        let mut view = self.session.clone();
        view.orders = self.entries.iter().map(|e| e.order().clone()).collect();
        view.recompute_total();
        view
    }

    pub(super) fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }
}

/// Process-wide table session store
///
/// Constructed once at startup and shared by `Arc`.
pub struct SessionRegistry {
    max_tables: u32,
    pub(super) tables: Mutex<HashMap<u32, TableState>>,
    feeds: Mutex<HashMap<u32, ListenerSet<TableSession>>>,
}

impl SessionRegistry {
    pub fn new(max_tables: u32) -> Self {
        Self {
            max_tables,
            tables: Mutex::new(HashMap::new()),
            feeds: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_tables(&self) -> u32 {
        self.max_tables
    }

    pub(super) fn check_table(&self, table_number: u32) -> SyncResult<()> {
        validate_table(table_number, self.max_tables).map_err(SyncError::from)
    }

    pub(super) fn notify(&self, table_number: u32, view: &TableSession) {
        let feed = self.feeds.lock().get(&table_number).cloned();
        if let Some(feed) = feed {
            let report = feed.dispatch("session", view);
            if report.failed > 0 {
                tracing::warn!(
                    table_number,
                    failed = report.failed,
                    "Session subscribers failed"
                );
            }
        }
    }

    // ========== Queries ==========

    /// Local lookup, never touches the network
    pub fn get_session(&self, table_number: u32) -> Option<TableSession> {
        self.tables.lock().get(&table_number).map(TableState::view)
    }

    /// No active session on the table
    pub fn is_available(&self, table_number: u32) -> bool {
        !self
            .tables
            .lock()
            .get(&table_number)
            .is_some_and(|state| state.session.is_active())
    }

    /// Raw entries of a table, pending ones included
    pub fn entries(&self, table_number: u32) -> Vec<SyncedOrder> {
        self.tables
            .lock()
            .get(&table_number)
            .map(|state| state.entries.clone())
            .unwrap_or_default()
    }

    pub fn pending_count(&self, table_number: u32) -> usize {
        self.tables
            .lock()
            .get(&table_number)
            .map_or(0, TableState::pending_count)
    }

    /// Look an order up by id across all tables
    pub fn find_order(&self, order_id: &str) -> Option<Order> {
        self.tables.lock().values().find_map(|state| {
            state
                .entries
                .iter()
                .map(SyncedOrder::order)
                .find(|o| same_id(&o.id, order_id))
                .cloned()
        })
    }

    /// Orders of all active sessions, by table then submission order
    pub fn active_orders(&self) -> Vec<Order> {
        let tables = self.tables.lock();
        let mut numbers: Vec<u32> = tables
            .iter()
            .filter(|(_, state)| state.session.is_active())
            .map(|(number, _)| *number)
            .collect();
        numbers.sort_unstable();
        numbers
            .into_iter()
            .flat_map(|number| tables[&number].entries.iter().map(|e| e.order().clone()))
            .collect()
    }

    /// Called with the new session view after every mutation of that table
    pub fn subscribe<F>(&self, table_number: u32, listener: F) -> Subscription
    where
        F: Fn(&TableSession) + Send + Sync + 'static,
    {
        let feed = self
            .feeds
            .lock()
            .entry(table_number)
            .or_default()
            .clone();
        feed.add(listener)
    }

    // ========== Mutations ==========

    /// Open a client-issued session, superseding any current one
    pub fn start_session(
        &self,
        table_number: u32,
        customer_name: &str,
        guest_count: u32,
    ) -> SyncResult<TableSession> {
        self.check_table(table_number)?;
        let customer_name = validate_customer_name(customer_name)?;

        let session = TableSession::new(
            Uuid::new_v4().to_string(),
            table_number,
            customer_name,
            guest_count,
        );
        let view = {
            let mut tables = self.tables.lock();
            if let Some(previous) = tables
                .get(&table_number)
                .filter(|state| state.session.is_active())
            {
                tracing::info!(
                    table_number,
                    previous_session = %previous.session.session_id,
                    "Active session superseded by a new local session"
                );
            }
            let state = TableState::new(session, Vec::new());
            let view = state.view();
            tables.insert(table_number, state);
            view
        };

        tracing::info!(table_number, session_id = %view.session_id, "Session started");
        self.notify(table_number, &view);
        Ok(view)
    }

    /// Append an optimistic order built from `lines` to the table's session.
    ///
    /// Local-only path: nothing is sent to the server.
    pub fn add_order_to_session(&self, table_number: u32, lines: &[CartLine]) -> SyncResult<Order> {
        self.check_table(table_number)?;
        let order = build_order(table_number, lines)?;
        let (_, order) = self.insert_pending(table_number, order)?;
        Ok(order)
    }

    /// Insert a provisional order; returns its correlation id and the order
    /// as stored (phone attached).
    pub(crate) fn insert_pending(
        &self,
        table_number: u32,
        mut order: Order,
    ) -> SyncResult<(Uuid, Order)> {
        let correlation_id = Uuid::new_v4();
        let view = {
            let mut tables = self.tables.lock();
            let state = tables
                .get_mut(&table_number)
                .filter(|state| state.session.is_active())
                .ok_or(SyncError::NoActiveSession(table_number))?;
            order.table_number = table_number;
            if order.customer_phone.is_none() {
                order.customer_phone = state.session.phone_number.clone();
            }
            state.entries.push(SyncedOrder::Pending {
                correlation_id,
                order: order.clone(),
            });
            state.view()
        };

        tracing::debug!(
            table_number,
            order_id = %order.id,
            %correlation_id,
            total = order.total,
            "Provisional order added"
        );
        self.notify(table_number, &view);
        Ok((correlation_id, order))
    }

    /// Drop a provisional order (submission failed). Returns `false` if it
    /// was already gone, e.g. replaced by a reconciliation.
    pub(crate) fn discard_pending(&self, table_number: u32, correlation_id: Uuid) -> bool {
        let view = {
            let mut tables = self.tables.lock();
            let Some(state) = tables.get_mut(&table_number) else {
                return false;
            };
            let before = state.entries.len();
            state
                .entries
                .retain(|e| e.correlation_id() != Some(correlation_id));
            if state.entries.len() == before {
                return false;
            }
            state.view()
        };

        tracing::debug!(table_number, %correlation_id, "Provisional order rolled back");
        self.notify(table_number, &view);
        true
    }

    /// Attach the customer's phone number. Malformed input changes nothing.
    pub fn update_session_phone(&self, table_number: u32, phone: &str) -> SyncResult<()> {
        let phone = validate_phone(phone)?;
        self.check_table(table_number)?;

        let view = {
            let mut tables = self.tables.lock();
            let state = tables
                .get_mut(&table_number)
                .filter(|state| state.session.is_active())
                .ok_or(SyncError::NoActiveSession(table_number))?;
            state.session.phone_number = Some(phone);
            state.view()
        };

        tracing::debug!(table_number, "Session phone updated");
        self.notify(table_number, &view);
        Ok(())
    }

    /// Close the table's session after payment. Returns `false` if it was
    /// already completed.
    pub fn complete_session(&self, table_number: u32) -> SyncResult<bool> {
        let view = {
            let mut tables = self.tables.lock();
            let state = tables
                .get_mut(&table_number)
                .ok_or(SyncError::NoActiveSession(table_number))?;
            if !state.session.is_active() {
                return Ok(false);
            }
            state.session.status = SessionStatus::Completed;
            state.view()
        };

        tracing::info!(
            table_number,
            session_id = %view.session_id,
            total_amount = view.total_amount,
            "Session completed"
        );
        self.notify(table_number, &view);
        Ok(true)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("max_tables", &self.max_tables)
            .field("tables", &self.tables.lock().len())
            .finish()
    }
}
