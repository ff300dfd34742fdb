use std::sync::Arc;

use anyhow::Context;
use tandoor_sync::{
    Config, DashboardRefresher, EventBus, KitchenBoard, SessionRegistry, SyncService,
    init_logger_with_file,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment and logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(
        api_url = %config.api_url,
        api_mode = ?config.api_mode,
        max_tables = config.max_tables,
        "Tandoor sync starting"
    );

    // 2. Core components
    let api = config
        .client_config()
        .build()
        .context("failed to build order API client")?;
    let bus = Arc::new(EventBus::new());
    let registry = Arc::new(SessionRegistry::new(config.max_tables));
    let service = SyncService::new(api, bus.clone(), registry.clone());

    // 3. Projections and staff desk
    let kitchen = KitchenBoard::attach(&bus, config.priority_thresholds());
    let desk = service.payment_desk();

    let shutdown = CancellationToken::new();
    let refresher = DashboardRefresher::new(
        registry.clone(),
        bus.clone(),
        config.refresh_interval(),
        shutdown.clone(),
    )
    .spawn();

    bus.order_status().subscribe(|e| {
        tracing::info!(order_id = %e.id, table_number = e.table_number, status = %e.status, "order-status-changed");
    });
    bus.notifications().subscribe(|e| {
        tracing::info!(table_number = e.table_number, kind = ?e.kind, message = %e.message, "customer-notification");
    });
    bus.payment_confirmed().subscribe(|e| {
        tracing::info!(table_number = e.table_number, request_id = ?e.request_id, "payment-confirmed");
    });

    // 4. Optional table session
    if let Some(table_number) = config.table_number {
        match service.open_session(table_number, "Guest", 1).await {
            Ok(session) => tracing::info!(
                table_number,
                session_id = %session.session_id,
                orders = session.orders.len(),
                total_amount = session.total_amount,
                "Table session ready"
            ),
            Err(e) => tracing::error!(table_number, error = %e, "Could not open table session"),
        }
    }

    // 5. Run until interrupted
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!(
        open_tickets = kitchen.queue().len(),
        pending_payments = desk.pending().len(),
        "Shutting down"
    );

    shutdown.cancel();
    refresher.await.context("dashboard refresher panicked")?;
    kitchen.detach();
    desk.detach();

    Ok(())
}
