//! Cash payment flow
//!
//! - [`TablePayments`] / [`PaymentWatcher`] - table side
//! - [`PaymentDesk`] - staff side

pub mod desk;
pub mod table;

pub use desk::{ConfirmOutcome, PaymentDesk};
pub use table::{PaymentWatcher, TablePaymentState, TablePayments};
