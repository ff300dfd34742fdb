//! Utilities: errors, validation, logging

pub mod error;
pub mod logger;
pub mod validation;

pub use error::{SyncError, SyncResult, ValidationError};
