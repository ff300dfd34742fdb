//! Table sessions
//!
//! - [`SessionRegistry`] - local table → session store with per-table feeds
//! - [`reconcile`] - server snapshots applied to the registry

pub mod reconcile;
pub mod registry;

pub use reconcile::{Confirmation, ReconcileOutcome};
pub use registry::{SessionRegistry, SyncedOrder};
