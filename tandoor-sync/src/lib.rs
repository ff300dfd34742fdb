//! Tandoor Sync - restaurant order/session synchronization core
//!
//! # Overview
//!
//! Keeps table clients, the kitchen and the staff desk consistent while the
//! external order API stays authoritative:
//!
//! - **Event bus** (`message`): typed in-process pub/sub channels
//! - **Session registry** (`sessions`): table → session store with optimistic
//!   entries and server reconciliation
//! - **Order aggregator** (`orders`): cart, validation, totals, views
//! - **Payment flow** (`payments`): cash request, confirmation, session close
//! - **Projections** (`projections`): kitchen board, dashboard refresher
//!
//! # Module layout
//!
//! ```text
//! tandoor-sync/src/
//! ├── core/          # config, SyncService
//! ├── message/       # event bus
//! ├── orders/        # aggregation and views
//! ├── sessions/      # registry and reconciliation
//! ├── payments/      # cash payment flow
//! ├── projections/   # read-only views fed by the bus
//! └── utils/         # errors, validation, logging
//! ```

pub mod core;
pub mod message;
pub mod orders;
pub mod payments;
pub mod projections;
pub mod sessions;
pub mod utils;

pub use crate::core::{Config, SyncService};
pub use message::{EventBus, Subscription};
pub use orders::{Cart, CartLine};
pub use payments::{ConfirmOutcome, PaymentDesk, PaymentWatcher, TablePaymentState, TablePayments};
pub use projections::{DashboardRefresher, KitchenBoard};
pub use sessions::{ReconcileOutcome, SessionRegistry, SyncedOrder};
pub use utils::{SyncError, SyncResult, ValidationError};

pub use utils::logger::{init_logger, init_logger_with_file};
