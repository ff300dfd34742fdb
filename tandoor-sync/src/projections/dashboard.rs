//! Dashboard refresher
//!
//! The only timer in the core: publishes a `dashboard-batch-update` with all
//! active orders on a fixed interval so dashboards re-derive priorities.
//! Priority itself is never stored.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::message::DashboardBatchUpdate;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::message::EventBus;
use crate::sessions::SessionRegistry;

pub struct DashboardRefresher {
    registry: Arc<SessionRegistry>,
    bus: Arc<EventBus>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl DashboardRefresher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        bus: Arc<EventBus>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            bus,
            interval,
            shutdown,
        }
    }

    /// Publish one batch now. Returns the number of orders in it.
    pub fn publish_batch(&self) -> usize {
        let orders = self.registry.active_orders();
        let count = orders.len();
        self.bus.publish(DashboardBatchUpdate {
            orders,
            generated_at: Utc::now(),
        });
        count
    }

    /// Run until the shutdown token is cancelled
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Dashboard refresher started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let count = self.publish_batch();
                    tracing::trace!(orders = count, "Dashboard batch published");
                }
            }
        }

        tracing::info!("Dashboard refresher stopped");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
