//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request:
//!     → identity.rs (who is calling? which challenge on refusal?)
//!     → permission.rs (route's table + method + identity → allow / deny)
//!     → Pass to materialization and dispatch
//! ```
//!
//! # Design Decisions
//! - Authentication is delegated; the gate only reads a resolved identity
//! - Missing table entries default to public access
//! - The check always precedes the handler

pub mod identity;
pub mod permission;

pub use identity::{from_config, AnonymousProvider, IdentityProvider, TrustedHeaderProvider};
pub use permission::{allowed, Access, PermissionTable, WILDCARD};
