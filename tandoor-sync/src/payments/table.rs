//! Table-side payment flow
//!
//! ```text
//! Idle ──cash-payment-requested──▶ AwaitingConfirmation ──payment-confirmed──▶ Paid
//! ```
//!
//! [`TablePayments`] issues the request; [`PaymentWatcher`] follows the
//! table's state from bus events and closes the session once paid.

use std::sync::Arc;

use parking_lot::Mutex;
use shared::message::CashPaymentRequested;
use shared::models::CashPaymentRequest;
use shared::request::CreatePaymentRequest;
use tandoor_client::OrderApi;

use crate::message::{EventBus, Subscription};
use crate::orders::{consolidate_items, items_total};
use crate::sessions::SessionRegistry;
use crate::utils::{SyncError, SyncResult, ValidationError};

/// Issues cash payment requests for table sessions
pub struct TablePayments {
    api: Arc<dyn OrderApi>,
    bus: Arc<EventBus>,
    registry: Arc<SessionRegistry>,
}

impl TablePayments {
    pub fn new(api: Arc<dyn OrderApi>, bus: Arc<EventBus>, registry: Arc<SessionRegistry>) -> Self {
        Self { api, bus, registry }
    }

    /// Ask staff to collect cash for the table's current bill
    ///
    /// Requires an active session with at least one order and a captured
    /// phone number. Nothing is published unless the server accepted the
    /// request.
    pub async fn request_cash_payment(&self, table_number: u32) -> SyncResult<CashPaymentRequest> {
        let session = self
            .registry
            .get_session(table_number)
            .filter(|s| s.is_active())
            .ok_or(SyncError::NoActiveSession(table_number))?;
        if session.orders.is_empty() {
            return Err(ValidationError::EmptyOrder.into());
        }
        let customer_phone = session
            .phone_number
            .clone()
            .ok_or(ValidationError::MissingPhone(table_number))?;

        let items = consolidate_items(session.orders.iter().flat_map(|o| &o.items));
        let total = items_total(&items)?;

        let request = CreatePaymentRequest {
            table_number,
            customer_phone: customer_phone.clone(),
            total,
            items,
        };
        let payment = self.api.create_payment_request(&request).await.map_err(|e| {
            tracing::warn!(table_number, error = %e, "Cash payment request failed");
            SyncError::from(e)
        })?;

        tracing::info!(
            table_number,
            request_id = %payment.id,
            total = payment.total,
            "Cash payment requested"
        );
        self.bus.publish(CashPaymentRequested {
            request_id: payment.id.clone(),
            table_number,
            customer_phone,
            total: payment.total,
            items: payment.items.clone(),
        });
        Ok(payment)
    }
}

/// Local payment state of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TablePaymentState {
    #[default]
    Idle,
    AwaitingConfirmation,
    Paid,
}

/// Follows one table's payment through bus events
pub struct PaymentWatcher {
    table_number: u32,
    state: Arc<Mutex<TablePaymentState>>,
    subscriptions: Vec<Subscription>,
}

impl PaymentWatcher {
    /// Subscribe to the payment channels for `table_number`
    pub fn attach(table_number: u32, bus: &EventBus, registry: Arc<SessionRegistry>) -> Self {
        let state = Arc::new(Mutex::new(TablePaymentState::Idle));

        let requested = {
            let state = Arc::clone(&state);
            bus.cash_requests().subscribe(move |event| {
                if event.table_number != table_number {
                    return;
                }
                let mut state = state.lock();
                if *state == TablePaymentState::Idle {
                    *state = TablePaymentState::AwaitingConfirmation;
                    tracing::debug!(table_number, request_id = %event.request_id, "Awaiting cash confirmation");
                }
            })
        };

        let confirmed = {
            let state = Arc::clone(&state);
            bus.payment_confirmed().subscribe(move |event| {
                if event.table_number != table_number {
                    return;
                }
                {
                    let mut state = state.lock();
                    if *state == TablePaymentState::Paid {
                        return;
                    }
                    if *state == TablePaymentState::Idle {
                        tracing::debug!(table_number, "Payment confirmed without a tracked request");
                    }
                    *state = TablePaymentState::Paid;
                }
                tracing::info!(table_number, request_id = ?event.request_id, "Table paid");
                if let Err(e) = registry.complete_session(table_number) {
                    tracing::warn!(table_number, error = %e, "Could not complete session after payment");
                }
            })
        };

        Self {
            table_number,
            state,
            subscriptions: vec![requested, confirmed],
        }
    }

    pub fn table_number(&self) -> u32 {
        self.table_number
    }

    pub fn state(&self) -> TablePaymentState {
        *self.state.lock()
    }

    /// Back to `Idle` for the table's next session
    pub fn reset(&self) {
        *self.state.lock() = TablePaymentState::Idle;
    }

    /// Stop following the table
    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

impl std::fmt::Debug for PaymentWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentWatcher")
            .field("table_number", &self.table_number)
            .field("state", &self.state())
            .finish()
    }
}
