//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID assigned/propagated)
//!     → relay handlers
//!     → response.rs (envelopes, image streaming)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRelayRequestId, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, RelayServer};
