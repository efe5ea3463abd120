//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger(reason) → every ShutdownHandle (server, reload task) resolves
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger_on_signal → trigger(StopReason::Signal)
//! ```
//!
//! # Design Decisions
//! - Stop accepting first, then let in-flight requests finish

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownHandle, StopReason};
pub use signals::shutdown_signal;
