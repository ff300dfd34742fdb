//! Data models
//!
//! Wire-compatible with the external order API: camelCase field names,
//! lowercase enum values, ids normalized through [`crate::util::de_id`].
//! Money is integer currency units (`i64`).

pub mod order;
pub mod payment;
pub mod session;

// Re-exports
pub use order::*;
pub use payment::*;
pub use session::*;
