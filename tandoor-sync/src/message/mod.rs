//! In-process event bus
//!
//! - [`EventBus`] - one typed [`Channel`] per event kind
//! - [`ListenerSet`] - ordered, panic-isolated listener registry (also used
//!   by the session registry's per-table feeds)
//! - [`Subscription`] - de-registration handle

pub mod bus;
pub mod listener;

pub use bus::{Channel, EventBus};
pub use listener::{DispatchReport, Listener, ListenerSet, Subscription};
