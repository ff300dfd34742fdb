use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use shared::message::{CustomerNotification, NotificationKind, OrderStatusChanged};
use shared::models::{Order, OrderStatus, TableSession};
use shared::request::{CreateSessionRequest, OrderPatch, SubmitOrderRequest};
use shared::util::canonical_id;
use tandoor_client::{ClientError, OrderApi};

use crate::message::EventBus;
use crate::orders::Cart;
use crate::payments::{PaymentDesk, TablePayments};
use crate::sessions::{Confirmation, SessionRegistry};
use crate::utils::validation::{validate_customer_name, validate_table};
use crate::utils::{SyncError, SyncResult};

/// Synchronization core - shared handles to every component
///
/// Cheap to clone; all fields are `Arc`s.
///
/// | Field | Type | Role |
/// |-------|------|------|
/// | api | `Arc<dyn OrderApi>` | external order API |
/// | bus | `Arc<EventBus>` | in-process pub/sub |
/// | registry | `Arc<SessionRegistry>` | table → session store |
/// | submit_locks | per-table async mutex | one submission in flight per table |
#[derive(Clone)]
pub struct SyncService {
    api: Arc<dyn OrderApi>,
    bus: Arc<EventBus>,
    registry: Arc<SessionRegistry>,
    submit_locks: Arc<Mutex<HashMap<u32, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SyncService {
    pub fn new(api: Arc<dyn OrderApi>, bus: Arc<EventBus>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            api,
            bus,
            registry,
            submit_locks: Arc::default(),
        }
    }

    pub fn api(&self) -> &Arc<dyn OrderApi> {
        &self.api
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Table-side payment requests sharing this service's handles
    pub fn table_payments(&self) -> TablePayments {
        TablePayments::new(self.api.clone(), self.bus.clone(), self.registry.clone())
    }

    /// Staff-side payment desk listening on this service's bus
    pub fn payment_desk(&self) -> PaymentDesk {
        PaymentDesk::attach(self.api.clone(), self.bus.clone())
    }

    fn table_lock(&self, table_number: u32) -> Arc<tokio::sync::Mutex<()>> {
        self.submit_locks
            .lock()
            .entry(table_number)
            .or_default()
            .clone()
    }

    // ========== Sessions ==========

    /// Join the table's active server session, creating one if there is none
    pub async fn open_session(
        &self,
        table_number: u32,
        customer_name: &str,
        guest_count: u32,
    ) -> SyncResult<TableSession> {
        validate_table(table_number, self.registry.max_tables())?;
        let customer_name = validate_customer_name(customer_name)?;

        let snapshot = match self.api.find_session(table_number).await? {
            Some(existing) => {
                tracing::info!(table_number, session_id = %existing.session_id, "Joined active session");
                existing
            }
            None => {
                let created = self
                    .api
                    .create_session(&CreateSessionRequest {
                        table_number,
                        customer_name,
                        guest_count,
                    })
                    .await?;
                tracing::info!(table_number, session_id = %created.session_id, "Session created");
                created
            }
        };

        Ok(self.registry.seed(snapshot)?.session)
    }

    /// Re-fetch the table's session and reconcile it
    ///
    /// When the server has no active session any more the local one is
    /// completed and `None` is returned.
    pub async fn refresh_session(&self, table_number: u32) -> SyncResult<Option<TableSession>> {
        validate_table(table_number, self.registry.max_tables())?;

        match self.api.find_session(table_number).await? {
            Some(snapshot) => Ok(Some(self.registry.seed(snapshot)?.session)),
            None => {
                if !self.registry.is_available(table_number) {
                    tracing::info!(table_number, "Server closed the session, completing locally");
                    self.registry.complete_session(table_number)?;
                }
                Ok(None)
            }
        }
    }

    // ========== Orders ==========

    /// Submit the cart as one order
    ///
    /// The order shows up in the session immediately as a provisional entry
    /// and is replaced by the server's version on success. On failure the
    /// entry is rolled back and the cart is left untouched. Once the server
    /// has accepted the order the cart is cleared, even when the echoed
    /// session does not list it yet.
    pub async fn submit_order(&self, table_number: u32, cart: &mut Cart) -> SyncResult<Order> {
        validate_table(table_number, self.registry.max_tables())?;
        let order = cart.to_order(table_number)?;

        let lock = self.table_lock(table_number);
        let _guard = lock.lock().await;

        let session_id = self
            .registry
            .get_session(table_number)
            .filter(|s| s.is_active())
            .map(|s| s.session_id)
            .ok_or(SyncError::NoActiveSession(table_number))?;

        let (correlation_id, order) = self.registry.insert_pending(table_number, order)?;
        let request = SubmitOrderRequest::from(&order);

        let response = match self.api.submit_order(&session_id, &request).await {
            Ok(response) => response,
            Err(e) => {
                self.registry.discard_pending(table_number, correlation_id);
                tracing::warn!(
                    table_number,
                    error = %e,
                    retryable = e.is_transient(),
                    "Order submission failed, provisional order rolled back"
                );
                return Err(e.into());
            }
        };

        let order_id = response.order_id.clone();
        let outcome = self.registry.reconcile(
            response.session,
            Some(Confirmation {
                correlation_id,
                order_id: order_id.clone(),
            }),
        )?;
        // The server accepted the order even if its echo left it out
        let confirmed = outcome.confirmed.unwrap_or_else(|| {
            tracing::warn!(
                table_number,
                order_id = %order_id,
                "Accepted order missing from echoed session"
            );
            Order {
                id: canonical_id(&order_id),
                ..order
            }
        });

        cart.clear();
        tracing::info!(
            table_number,
            order_id = %confirmed.id,
            total = confirmed.total,
            session_total = outcome.session.total_amount,
            "Order submitted"
        );
        self.bus.publish(OrderStatusChanged::from_order(&confirmed));
        Ok(confirmed)
    }

    /// Move an order to `status` (staff action)
    ///
    /// Regressions are rejected locally when the order is known, and by the
    /// server otherwise. Setting the current status again is a no-op.
    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> SyncResult<Order> {
        if let Some(current) = self.registry.find_order(order_id) {
            current
                .status
                .transition_to(status)
                .map_err(|e| SyncError::transition(order_id, e))?;
            if current.status == status {
                return Ok(current);
            }
        }

        let updated = self
            .api
            .update_order(order_id, &OrderPatch::status(status))
            .await
            .map_err(|e| {
                tracing::warn!(order_id, %status, error = %e, "Status update failed");
                match e {
                    ClientError::NotFound(_) => SyncError::OrderNotFound(order_id.to_string()),
                    e => e.into(),
                }
            })?;
        let updated = match self.registry.apply_order_update(updated.clone()) {
            // A concurrent update already moved the order further
            Some(stored) if stored.status != updated.status => return Ok(stored),
            Some(stored) => stored,
            None => updated,
        };

        tracing::info!(order_id = %updated.id, status = %updated.status, "Order status updated");
        self.bus.publish(OrderStatusChanged::from_order(&updated));

        let notification = match updated.status {
            OrderStatus::Ready => Some(("Your order is ready", NotificationKind::Success)),
            OrderStatus::Cancelled => Some(("Your order was cancelled", NotificationKind::Warning)),
            _ => None,
        };
        if let Some((message, kind)) = notification {
            self.bus.publish(CustomerNotification {
                table_number: updated.table_number,
                message: message.to_string(),
                kind,
            });
        }
        Ok(updated)
    }
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("bus", &self.bus)
            .field("registry", &self.registry)
            .finish()
    }
}
