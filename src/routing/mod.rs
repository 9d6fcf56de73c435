//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     (template, prototype)[]
//!     → pattern.rs (parse placeholders, build anchored regex)
//!     → router.rs (freeze as immutable, ordered table)
//!
//! Incoming Request (decoded path)
//!     → router.rs (scan entries in registration order)
//!     → Return: RouteMatch { entry, path_params } or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same path always matches same route
//! - First match wins; no specificity ranking

pub mod pattern;
pub mod router;

pub use pattern::{PatternError, RoutePattern};
pub use router::{RouteEntry, RouteMatch, RouteRule, Router, RouterBuilder, SetupError};
