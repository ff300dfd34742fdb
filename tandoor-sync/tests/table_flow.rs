//! End-to-end table flow against the in-process order API

use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use shared::message::PaymentConfirmed;
use shared::models::{OrderStatus, Priority};
use tandoor_client::InProcessApi;
use tandoor_sync::orders::derive_priority;
use tandoor_sync::{
    Cart, CartLine, ConfirmOutcome, EventBus, KitchenBoard, PaymentWatcher, SessionRegistry,
    SyncError, SyncService, TablePaymentState,
};

struct TestHarness {
    api: Arc<InProcessApi>,
    bus: Arc<EventBus>,
    registry: Arc<SessionRegistry>,
    service: SyncService,
}

fn create_test_harness() -> TestHarness {
    let api = Arc::new(InProcessApi::new());
    let bus = Arc::new(EventBus::new());
    let registry = Arc::new(SessionRegistry::new(20));
    let service = SyncService::new(api.clone(), bus.clone(), registry.clone());
    TestHarness {
        api,
        bus,
        registry,
        service,
    }
}

fn cart(lines: &[CartLine]) -> Cart {
    let mut cart = Cart::new();
    for line in lines {
        cart.add(line.clone());
    }
    cart
}

fn record_confirmations(bus: &EventBus) -> Arc<Mutex<Vec<PaymentConfirmed>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    bus.payment_confirmed().subscribe(move |e| s.lock().push(e.clone()));
    seen
}

#[tokio::test]
async fn test_full_table_flow() {
    let h = create_test_harness();

    // Table 5 starts without a session
    assert!(h.registry.get_session(5).is_none());

    let session = h.service.open_session(5, "Asha", 2).await.unwrap();
    assert!(session.orders.is_empty());
    assert_eq!(session.total_amount, 0);
    assert_eq!(h.api.call_count("create_session"), 1);
    h.registry.update_session_phone(5, "9876543210").unwrap();

    // First submission
    let mut first = cart(&[CartLine::new("1", "Butter Naan", 2, 45)]);
    let order = h.service.submit_order(5, &mut first).await.unwrap();
    assert_eq!(order.total, 90);
    assert!(first.is_empty());
    assert_eq!(h.registry.get_session(5).unwrap().total_amount, 90);

    // Second submission
    let mut second = cart(&[CartLine::new("2", "Paneer Tikka", 1, 280)]);
    h.service.submit_order(5, &mut second).await.unwrap();
    let session = h.registry.get_session(5).unwrap();
    assert_eq!(session.orders.len(), 2);
    assert_eq!(session.total_amount, 370);
    assert_eq!(session.total_amount, session.orders_total());
    assert_eq!(h.registry.pending_count(5), 0);

    // Cash payment
    let watcher = PaymentWatcher::attach(5, &h.bus, h.registry.clone());
    let desk = h.service.payment_desk();
    let confirmations = record_confirmations(&h.bus);

    let payment = h.service.table_payments().request_cash_payment(5).await.unwrap();
    assert_eq!(payment.total, 370);
    assert_eq!(watcher.state(), TablePaymentState::AwaitingConfirmation);
    assert_eq!(desk.pending().len(), 1);

    let outcome = desk.confirm(&payment.id).await.unwrap();
    assert!(matches!(outcome, ConfirmOutcome::Confirmed(_)));
    assert_eq!(
        desk.confirm(&payment.id).await.unwrap(),
        ConfirmOutcome::AlreadySettled
    );

    let confirmations = confirmations.lock();
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0].table_number, 5);
    assert_eq!(watcher.state(), TablePaymentState::Paid);
    assert!(h.registry.is_available(5));
    assert!(h.api.payment_request(&payment.id).unwrap().is_confirmed());
}

#[tokio::test]
async fn test_phone_captured_before_ordering_allows_payment() {
    let h = create_test_harness();
    h.service.open_session(5, "Asha", 2).await.unwrap();
    h.registry.update_session_phone(5, "9876543210").unwrap();

    let mut c = cart(&[CartLine::new("1", "Butter Naan", 2, 45)]);
    h.service.submit_order(5, &mut c).await.unwrap();
    assert_eq!(
        h.registry.get_session(5).unwrap().phone_number.as_deref(),
        Some("9876543210")
    );

    h.service.refresh_session(5).await.unwrap();
    let payment = h.service.table_payments().request_cash_payment(5).await.unwrap();
    assert_eq!(payment.customer_phone, "9876543210");
    assert_eq!(payment.total, 90);
}

#[tokio::test]
async fn test_submission_replaces_all_local_entries() {
    let h = create_test_harness();
    h.service.open_session(5, "Asha", 2).await.unwrap();
    h.registry
        .add_order_to_session(5, &[CartLine::local("Chai", 1, 30)])
        .unwrap();
    h.registry
        .add_order_to_session(5, &[CartLine::local("Lassi", 1, 60)])
        .unwrap();
    assert_eq!(h.registry.pending_count(5), 2);

    let mut c = cart(&[CartLine::new("1", "Butter Naan", 2, 45)]);
    let order = h.service.submit_order(5, &mut c).await.unwrap();

    let local = h.registry.get_session(5).unwrap();
    let server = h.api.active_session(5).unwrap();
    assert_eq!(h.registry.pending_count(5), 0);
    assert_eq!(local.orders.len(), 1);
    assert_eq!(local.orders[0].id, order.id);
    assert_eq!(local.orders, server.orders);
    assert_eq!(local.total_amount, 90);
}

#[tokio::test]
async fn test_no_duplicates_after_reconcile() {
    let h = create_test_harness();
    h.service.open_session(5, "Asha", 2).await.unwrap();

    for _ in 0..3 {
        let mut c = cart(&[CartLine::new("1", "Butter Naan", 1, 45)]);
        h.service.submit_order(5, &mut c).await.unwrap();
    }

    let session = h.registry.get_session(5).unwrap();
    let mut ids: Vec<&str> = session.orders.iter().map(|o| o.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(session.orders.len(), 3);
    assert_eq!(session.total_amount, 135);
}

#[tokio::test]
async fn test_concurrent_submissions_on_one_table() {
    let h = create_test_harness();
    h.service.open_session(5, "Asha", 2).await.unwrap();

    let mut a = cart(&[CartLine::new("1", "Butter Naan", 2, 45)]);
    let mut b = cart(&[CartLine::new("2", "Paneer Tikka", 1, 280)]);
    let (ra, rb) = tokio::join!(
        h.service.submit_order(5, &mut a),
        h.service.submit_order(5, &mut b)
    );
    ra.unwrap();
    rb.unwrap();

    let session = h.registry.get_session(5).unwrap();
    assert_eq!(session.orders.len(), 2);
    assert_eq!(session.total_amount, 370);
}

#[tokio::test]
async fn test_network_failure_keeps_cart_and_state() {
    let h = create_test_harness();
    h.service.open_session(5, "Asha", 2).await.unwrap();

    let states = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&states);
    h.registry
        .subscribe(5, move |session| s.lock().push(session.orders.len()));

    h.api.set_offline(true);
    let mut c = cart(&[CartLine::new("1", "Butter Naan", 2, 45)]);
    let err = h.service.submit_order(5, &mut c).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
    assert!(err.is_retryable());

    // Provisional entry shown, then rolled back
    assert_eq!(*states.lock(), vec![1, 0]);
    assert_eq!(c.len(), 1);
    assert_eq!(h.registry.get_session(5).unwrap().total_amount, 0);

    // Retry with the same cart
    h.api.set_offline(false);
    let order = h.service.submit_order(5, &mut c).await.unwrap();
    assert_eq!(order.total, 90);
    assert!(c.is_empty());
}

#[tokio::test]
async fn test_status_moves_forward_only() {
    let h = create_test_harness();
    let kitchen = KitchenBoard::attach(&h.bus, Default::default());
    h.service.open_session(5, "Asha", 2).await.unwrap();
    let mut c = cart(&[CartLine::new("1", "Butter Naan", 2, 45)]);
    let order = h.service.submit_order(5, &mut c).await.unwrap();
    assert_eq!(kitchen.queue().len(), 1);

    // Forward skip is allowed
    h.service
        .update_order_status(&order.id, OrderStatus::Served)
        .await
        .unwrap();
    assert!(kitchen.queue().is_empty());

    let err = h
        .service
        .update_order_status(&order.id, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidTransition { .. }));
    assert_eq!(
        h.registry.find_order(&order.id).unwrap().status,
        OrderStatus::Served
    );
}

#[tokio::test]
async fn test_priority_by_age() {
    let h = create_test_harness();
    h.service.open_session(5, "Asha", 2).await.unwrap();
    let mut c = cart(&[CartLine::new("1", "Butter Naan", 1, 45)]);
    let order = h.service.submit_order(5, &mut c).await.unwrap();

    let placed = order.timestamp;
    assert_eq!(derive_priority(&order, placed + Duration::minutes(10)), Priority::Low);
    assert_eq!(derive_priority(&order, placed + Duration::minutes(20)), Priority::Medium);
    assert_eq!(derive_priority(&order, placed + Duration::minutes(40)), Priority::High);
    assert_eq!(derive_priority(&order, Utc::now()), Priority::Low);
}

#[tokio::test]
async fn test_late_listener_misses_earlier_payment() {
    let h = create_test_harness();
    h.bus.publish(PaymentConfirmed {
        request_id: None,
        customer_phone: "9876543210".to_string(),
        table_number: 5,
    });
    let seen = record_confirmations(&h.bus);
    assert!(seen.lock().is_empty());
}
