//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → gate (browser-version check, may answer directly)
//!     → upstream.rs (proxy to the upstream dev server, or serve static files)
//!     → Send to client
//! ```

pub mod request;
pub mod server;
pub mod upstream;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{DevGateServer, ServerError, STATUS_PATH};
pub use upstream::{Pipeline, UpstreamProxy};
