//! MCP relay library.
//!
//! Relays EDF uploads to an EDF processing service and text questions to a
//! local inference service.

pub mod config;
pub mod downstream;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use error::RelayError;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
