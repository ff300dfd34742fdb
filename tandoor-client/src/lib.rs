//! Tandoor Client - HTTP client for the external order API
//!
//! Provides the [`OrderApi`] seam the synchronization core talks to, a
//! reqwest-backed implementation, and (with the `in-process` feature) an
//! in-memory implementation.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "in-process")]
pub mod memory;

pub use api::OrderApi;
pub use config::{ClientConfig, ClientType};
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
#[cfg(feature = "in-process")]
pub use memory::InProcessApi;
