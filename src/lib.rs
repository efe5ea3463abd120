//! Development-server front with a browser-version gate.

pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::DevGateConfig;
pub use gate::{BrowserGate, GateDecision, UserAgentSignature};
pub use http::DevGateServer;
pub use lifecycle::Shutdown;
