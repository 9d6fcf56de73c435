//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → consumed once at startup by the server and the gate
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table is too
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    GateConfig, IdentityConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    Settings, TimeoutConfig, UNAUTHORIZED_PAGE,
};
pub use validation::{validate_config, ValidationError};
