//! Order API seam
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | `find_session` | `GET /sessions/table/{tableNumber}` |
//! | `create_session` | `POST /sessions` |
//! | `submit_order` | `POST /sessions/{sessionId}/orders` |
//! | `update_order` | `PATCH /orders/{orderId}` |
//! | `create_payment_request` | `POST /payment-requests` |
//! | `confirm_payment` | `POST /payment-requests/{id}/confirm` |

use async_trait::async_trait;
use shared::models::{CashPaymentRequest, Order, TableSession};
use shared::request::{
    CreatePaymentRequest, CreateSessionRequest, OrderPatch, PaymentAck, SubmitOrderRequest,
    SubmitOrderResponse,
};

use crate::ClientResult;

/// External order/session/payment API
///
/// Every call is a suspension point; callers treat the in-flight period as
/// unconfirmed.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Active session of a table, `None` when the table is available
    async fn find_session(&self, table_number: u32) -> ClientResult<Option<TableSession>>;

    async fn create_session(&self, request: &CreateSessionRequest) -> ClientResult<TableSession>;

    async fn submit_order(
        &self,
        session_id: &str,
        request: &SubmitOrderRequest,
    ) -> ClientResult<SubmitOrderResponse>;

    async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> ClientResult<Order>;

    async fn create_payment_request(
        &self,
        request: &CreatePaymentRequest,
    ) -> ClientResult<CashPaymentRequest>;

    async fn confirm_payment(&self, request_id: &str) -> ClientResult<PaymentAck>;
}
