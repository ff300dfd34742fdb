//! In-process order API
//!
//! Keeps sessions, orders and payment requests in memory and answers the way
//! the HTTP backend does: submissions echo the whole updated session, status
//! regressions are rejected, confirmations are idempotent. Failure injection
//! (`set_offline`, `fail_next`) lets callers exercise network-failure paths.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::models::{
    CashPaymentRequest, Order, OrderItem, OrderStatus, PaymentStatus, SessionStatus, TableSession,
};
use shared::request::{
    CreatePaymentRequest, CreateSessionRequest, OrderPatch, PaymentAck, SubmitOrderRequest,
    SubmitOrderResponse,
};
use shared::util::same_id;

use crate::{ClientError, ClientResult, OrderApi};

const FIRST_SESSION_ID: u64 = 500;
const FIRST_ORDER_ID: u64 = 1000;

#[derive(Debug, Default)]
struct BackendState {
    sessions: Vec<TableSession>,
    payments: Vec<CashPaymentRequest>,
    next_session: u64,
    next_order: u64,
    next_payment: u64,
    offline: bool,
    fail_next: u32,
    calls: HashMap<&'static str, usize>,
}

impl BackendState {
    fn session_mut(&mut self, session_id: &str) -> Option<&mut TableSession> {
        self.sessions
            .iter_mut()
            .find(|s| same_id(&s.session_id, session_id))
    }

    fn order_mut(&mut self, order_id: &str) -> Option<(&mut Order, usize)> {
        self.sessions
            .iter_mut()
            .enumerate()
            .find_map(|(idx, session)| {
                session
                    .orders
                    .iter_mut()
                    .find(|o| same_id(&o.id, order_id))
                    .map(|o| (o, idx))
            })
    }
}

/// In-memory implementation of [`OrderApi`]
#[derive(Debug, Default)]
pub struct InProcessApi {
    state: Mutex<BackendState>,
}

impl InProcessApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every request until switched back
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Fail the next `count` requests with [`ClientError::Unavailable`]
    pub fn fail_next(&self, count: u32) {
        self.state.lock().fail_next = count;
    }

    /// Number of requests received for an operation (failed ones included)
    pub fn call_count(&self, operation: &str) -> usize {
        self.state.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Server-side view of a table's active session
    pub fn active_session(&self, table_number: u32) -> Option<TableSession> {
        self.state
            .lock()
            .sessions
            .iter()
            .rev()
            .find(|s| s.table_number == table_number && s.is_active())
            .cloned()
    }

    /// Server-side view of a payment request
    pub fn payment_request(&self, request_id: &str) -> Option<CashPaymentRequest> {
        self.state
            .lock()
            .payments
            .iter()
            .find(|p| same_id(&p.id, request_id))
            .cloned()
    }

    /// Insert a session as if another client had created it
    pub fn seed_session(&self, session: TableSession) {
        self.state.lock().sessions.push(session);
    }

    fn gate(&self, state: &mut BackendState, operation: &'static str) -> ClientResult<()> {
        *state.calls.entry(operation).or_default() += 1;
        if state.offline {
            return Err(ClientError::Unavailable(format!("{operation}: backend offline")));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(ClientError::Unavailable(format!("{operation}: injected failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderApi for InProcessApi {
    async fn find_session(&self, table_number: u32) -> ClientResult<Option<TableSession>> {
        let mut state = self.state.lock();
        self.gate(&mut state, "find_session")?;
        Ok(state
            .sessions
            .iter()
            .rev()
            .find(|s| s.table_number == table_number && s.is_active())
            .cloned())
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> ClientResult<TableSession> {
        let mut state = self.state.lock();
        self.gate(&mut state, "create_session")?;

        for session in state
            .sessions
            .iter_mut()
            .filter(|s| s.table_number == request.table_number && s.is_active())
        {
            session.status = SessionStatus::Completed;
        }

        let id = FIRST_SESSION_ID + state.next_session;
        state.next_session += 1;
        let session = TableSession::new(
            id.to_string(),
            request.table_number,
            request.customer_name.clone(),
            request.guest_count,
        );
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn submit_order(
        &self,
        session_id: &str,
        request: &SubmitOrderRequest,
    ) -> ClientResult<SubmitOrderResponse> {
        let mut state = self.state.lock();
        self.gate(&mut state, "submit_order")?;

        if request.items.is_empty() {
            return Err(ClientError::Validation("order has no items".to_string()));
        }

        let order_id = (FIRST_ORDER_ID + state.next_order).to_string();
        let session = state
            .session_mut(session_id)
            .ok_or_else(|| ClientError::NotFound(format!("session {session_id}")))?;
        if !session.is_active() {
            return Err(ClientError::Validation(format!(
                "session {session_id} is closed"
            )));
        }

        let mut order = Order {
            id: order_id.clone(),
            table_number: session.table_number,
            items: request
                .items
                .iter()
                .map(|item| OrderItem {
                    name: item.name.clone(),
                    item_id: item.item_id.clone(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            total: 0,
            status: OrderStatus::Pending,
            timestamp: Utc::now(),
            customer_phone: session.phone_number.clone(),
            estimated_time: None,
        };
        order.recompute_total();
        session.orders.push(order);
        session.recompute_total();
        let session = session.clone();

        state.next_order += 1;
        Ok(SubmitOrderResponse { order_id, session })
    }

    async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> ClientResult<Order> {
        let mut state = self.state.lock();
        self.gate(&mut state, "update_order")?;

        let (order, _) = state
            .order_mut(order_id)
            .ok_or_else(|| ClientError::NotFound(format!("order {order_id}")))?;
        if let Some(status) = patch.status {
            order.status = order
                .status
                .transition_to(status)
                .map_err(|e| ClientError::Validation(e.to_string()))?;
        }
        if let Some(minutes) = patch.estimated_time {
            order.estimated_time = Some(minutes);
        }
        Ok(order.clone())
    }

    async fn create_payment_request(
        &self,
        request: &CreatePaymentRequest,
    ) -> ClientResult<CashPaymentRequest> {
        let mut state = self.state.lock();
        self.gate(&mut state, "create_payment_request")?;

        state.next_payment += 1;
        let payment = CashPaymentRequest {
            id: format!("pay-{}", state.next_payment),
            table_number: request.table_number,
            customer_phone: request.customer_phone.clone(),
            total: request.total,
            items: request.items.clone(),
            status: PaymentStatus::Pending,
            requested_at: Utc::now(),
            confirmed_at: None,
        };
        state.payments.push(payment.clone());
        Ok(payment)
    }

    async fn confirm_payment(&self, request_id: &str) -> ClientResult<PaymentAck> {
        let mut state = self.state.lock();
        self.gate(&mut state, "confirm_payment")?;

        let payment = state
            .payments
            .iter_mut()
            .find(|p| same_id(&p.id, request_id))
            .ok_or_else(|| ClientError::NotFound(format!("payment request {request_id}")))?;
        payment.confirm(Utc::now());
        Ok(PaymentAck {
            request_id: payment.id.clone(),
            status: payment.status,
            confirmed_at: payment.confirmed_at,
        })
    }
}
