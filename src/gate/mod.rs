//! Browser-version gate.
//!
//! # Data Flow
//! ```text
//! Incoming request headers
//!     → signature.rs (User-Agent → Option<(family, major)>)
//!     → decision.rs (Forward | RespondWith)
//!     → middleware.rs (run next handler, or write notice.rs page)
//! ```
//!
//! # Design Decisions
//! - Fail open: anything that cannot be parsed is forwarded
//! - No per-request state; the only shared value is the swappable gate config
//! - Decision logic has no dependency on the middleware machinery

pub mod decision;
pub mod middleware;
pub mod notice;
pub mod signature;

pub use decision::{BrowserGate, GateDecision, GateResponse};
pub use middleware::{browser_gate_middleware, SharedGate};
pub use signature::{BrowserFamily, UserAgentSignature};
