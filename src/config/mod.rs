//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DevGateConfig (validated, immutable)
//!
//! On file change (in-place write or rename over the file):
//!     watcher.rs sees an event for the file in its directory
//!     → loader.rs parses the new contents
//!     → validation.rs validates
//!     → sent to the running server if it differs from the last one sent,
//!       and the server swaps in the new gate settings
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only gate settings are hot-reloadable
//! - All fields have defaults to allow minimal configs

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DevGateConfig, GateConfig, LimitsConfig, ListenerConfig, ObservabilityConfig,
    PipelineConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
