//! Event bus core implementation
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        EventBus                           │
//! │  order_status │ dashboard │ notifications │ cash │ paid   │
//! └───────┬───────────────────────────────────────────────────┘
//!         │ one Channel<E> per event kind
//!         ▼
//!   ListenerSet<E>  ──▶ synchronous callbacks, registration order
//!   broadcast::Sender<E> ──▶ async receivers (tasks)
//! ```
//!
//! No buffering and no replay: a listener (or receiver) only sees events
//! published after it registered. Ordering holds within one channel only.

use shared::message::{
    CashPaymentRequested, CustomerNotification, DashboardBatchUpdate, Event, EventKind,
    OrderStatusChanged, PaymentConfirmed,
};
use tokio::sync::broadcast;

use super::listener::{ListenerSet, Subscription};

/// Default capacity of each channel's async fan-out
const CHANNEL_CAPACITY: usize = 256;

/// One typed event channel
pub struct Channel<E> {
    kind: EventKind,
    listeners: ListenerSet<E>,
    tx: broadcast::Sender<E>,
}

impl<E> Channel<E>
where
    E: Clone + Send + 'static,
{
    fn new(kind: EventKind, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            kind,
            listeners: ListenerSet::new(),
            tx,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Register a synchronous listener
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listeners.add(listener)
    }

    /// Async stream of subsequent events
    ///
    /// Slow receivers lag (see [`broadcast::error::RecvError::Lagged`]);
    /// synchronous listeners are unaffected.
    pub fn receiver(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver to every listener registered now, then to async receivers.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn publish(&self, event: E) -> usize {
        let report = self.listeners.dispatch(self.kind.as_str(), &event);
        // No receivers is not an error
        let _ = self.tx.send(event);
        tracing::trace!(
            channel = %self.kind,
            delivered = report.delivered,
            failed = report.failed,
            "Event published"
        );
        report.delivered
    }
}

/// Process-wide publish/subscribe hub
///
/// Constructed once and shared by `Arc`; every component that produces or
/// observes events receives the same instance.
pub struct EventBus {
    order_status: Channel<OrderStatusChanged>,
    dashboard: Channel<DashboardBatchUpdate>,
    notifications: Channel<CustomerNotification>,
    cash_requests: Channel<CashPaymentRequested>,
    payment_confirmed: Channel<PaymentConfirmed>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Bus with a custom async fan-out capacity per channel
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order_status: Channel::new(EventKind::OrderStatusChanged, capacity),
            dashboard: Channel::new(EventKind::DashboardBatchUpdate, capacity),
            notifications: Channel::new(EventKind::CustomerNotification, capacity),
            cash_requests: Channel::new(EventKind::CashPaymentRequested, capacity),
            payment_confirmed: Channel::new(EventKind::PaymentConfirmed, capacity),
        }
    }

    pub fn order_status(&self) -> &Channel<OrderStatusChanged> {
        &self.order_status
    }

    pub fn dashboard(&self) -> &Channel<DashboardBatchUpdate> {
        &self.dashboard
    }

    pub fn notifications(&self) -> &Channel<CustomerNotification> {
        &self.notifications
    }

    pub fn cash_requests(&self) -> &Channel<CashPaymentRequested> {
        &self.cash_requests
    }

    pub fn payment_confirmed(&self) -> &Channel<PaymentConfirmed> {
        &self.payment_confirmed
    }

    /// Route a discriminated event to its channel
    pub fn publish(&self, event: impl Into<Event>) -> usize {
        match event.into() {
            Event::OrderStatusChanged(e) => self.order_status.publish(e),
            Event::DashboardBatchUpdate(e) => self.dashboard.publish(e),
            Event::CustomerNotification(e) => self.notifications.publish(e),
            Event::CashPaymentRequested(e) => self.cash_requests.publish(e),
            Event::PaymentConfirmed(e) => self.payment_confirmed.publish(e),
        }
    }

    /// Listeners currently registered on a channel
    pub fn listener_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::OrderStatusChanged => self.order_status.listener_count(),
            EventKind::DashboardBatchUpdate => self.dashboard.listener_count(),
            EventKind::CustomerNotification => self.notifications.listener_count(),
            EventKind::CashPaymentRequested => self.cash_requests.listener_count(),
            EventKind::PaymentConfirmed => self.payment_confirmed.listener_count(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("order_status", &self.order_status.listener_count())
            .field("dashboard", &self.dashboard.listener_count())
            .field("notifications", &self.notifications.listener_count())
            .field("cash_requests", &self.cash_requests.listener_count())
            .field("payment_confirmed", &self.payment_confirmed.listener_count())
            .finish()
    }
}
