//! Staff-side cash payment desk
//!
//! Materializes `cash-payment-requested` events into pending requests and
//! confirms them against the API. `payment-confirmed` is published once per
//! request, however many times staff press confirm.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use shared::message::PaymentConfirmed;
use shared::models::{CashPaymentRequest, PaymentStatus};
use shared::util::{canonical_id, same_id};
use tandoor_client::{ClientError, OrderApi};

use crate::message::{EventBus, Subscription};
use crate::utils::SyncResult;

/// Result of [`PaymentDesk::confirm`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This call confirmed the request and published `payment-confirmed`
    Confirmed(CashPaymentRequest),
    /// Unknown, dismissed or already confirmed; nothing happened
    AlreadySettled,
}

/// Requests still waiting for staff, plus the ids of settled ones
///
/// Settled requests are not kept; their canonical id is enough to ignore a
/// repeated event or confirmation.
#[derive(Debug, Default)]
struct DeskState {
    pending: Vec<CashPaymentRequest>,
    settled: HashSet<String>,
}

impl DeskState {
    fn position(&self, request_id: &str) -> Option<usize> {
        self.pending.iter().position(|r| same_id(&r.id, request_id))
    }

    fn is_settled(&self, request_id: &str) -> bool {
        self.settled.contains(&canonical_id(request_id))
    }
}

pub struct PaymentDesk {
    api: Arc<dyn OrderApi>,
    bus: Arc<EventBus>,
    state: Arc<Mutex<DeskState>>,
    subscription: Subscription,
}

impl PaymentDesk {
    /// Start collecting cash requests published on `bus`
    pub fn attach(api: Arc<dyn OrderApi>, bus: Arc<EventBus>) -> Self {
        let state: Arc<Mutex<DeskState>> = Arc::default();
        let sink = Arc::clone(&state);
        let subscription = bus.cash_requests().subscribe(move |event| {
            let mut state = sink.lock();
            if state.is_settled(&event.request_id) || state.position(&event.request_id).is_some() {
                tracing::debug!(request_id = %event.request_id, "Duplicate cash request ignored");
                return;
            }
            tracing::info!(
                request_id = %event.request_id,
                table_number = event.table_number,
                total = event.total,
                "Cash payment request received"
            );
            state.pending.push(CashPaymentRequest {
                id: event.request_id.clone(),
                table_number: event.table_number,
                customer_phone: event.customer_phone.clone(),
                total: event.total,
                items: event.items.clone(),
                status: PaymentStatus::Pending,
                requested_at: Utc::now(),
                confirmed_at: None,
            });
        });

        Self {
            api,
            bus,
            state,
            subscription,
        }
    }

    /// Requests waiting for confirmation, oldest first
    pub fn pending(&self) -> Vec<CashPaymentRequest> {
        self.state.lock().pending.clone()
    }

    /// A pending request by id
    pub fn get(&self, request_id: &str) -> Option<CashPaymentRequest> {
        let state = self.state.lock();
        state.position(request_id).map(|pos| state.pending[pos].clone())
    }

    /// Whether the request was confirmed through this desk
    pub fn is_settled(&self, request_id: &str) -> bool {
        self.state.lock().is_settled(request_id)
    }

    /// Confirm cash received for a request
    ///
    /// The request stays pending if the API call fails.
    pub async fn confirm(&self, request_id: &str) -> SyncResult<ConfirmOutcome> {
        if self.get(request_id).is_none() {
            tracing::debug!(request_id, "Confirm ignored, request not pending");
            return Ok(ConfirmOutcome::AlreadySettled);
        }

        let ack = self.api.confirm_payment(request_id).await.map_err(|e| {
            tracing::warn!(request_id, error = %e, "Payment confirmation failed");
            e
        })?;
        if ack.status != PaymentStatus::Confirmed {
            return Err(ClientError::InvalidResponse(format!(
                "payment request {request_id} not confirmed by server"
            ))
            .into());
        }

        // Re-check: another confirm may have completed while we waited
        let confirmed = {
            let mut state = self.state.lock();
            state.position(request_id).map(|pos| {
                let mut request = state.pending.remove(pos);
                request.confirm(ack.confirmed_at.unwrap_or_else(Utc::now));
                state.settled.insert(canonical_id(&request.id));
                request
            })
        };

        let Some(request) = confirmed else {
            return Ok(ConfirmOutcome::AlreadySettled);
        };

        tracing::info!(
            request_id = %request.id,
            table_number = request.table_number,
            total = request.total,
            "Cash payment confirmed"
        );
        self.bus.publish(PaymentConfirmed {
            request_id: Some(request.id.clone()),
            customer_phone: request.customer_phone.clone(),
            table_number: request.table_number,
        });
        Ok(ConfirmOutcome::Confirmed(request))
    }

    /// Drop a pending request without confirming it
    pub fn dismiss(&self, request_id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(pos) = state.position(request_id) else {
            return false;
        };
        state.pending.remove(pos);
        tracing::info!(request_id, "Cash payment request dismissed");
        true
    }

    /// Stop collecting new requests
    pub fn detach(self) {
        self.subscription.unsubscribe();
    }
}

impl std::fmt::Debug for PaymentDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDesk")
            .field("pending", &self.state.lock().pending.len())
            .finish()
    }
}
