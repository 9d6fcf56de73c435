//! Resource gate library.
//!
//! Ordered route templates map request paths to resource prototypes. Each
//! request gets its own copy of the matched resource, bound to a request
//! context after the route's permission table has been checked, and is then
//! dispatched to the verb capability the resource exposes.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod notes;
pub mod observability;
pub mod resource;
pub mod routing;
pub mod security;

pub use config::GateConfig;
pub use http::{Gate, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::Router;
