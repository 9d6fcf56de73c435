//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate, dispatch and recovery produce:
//!     → logging.rs (subscriber setup, structured events)
//!     → access_log.rs (one record per request, emitted on drop)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, plain or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows into every access record
//! - Metrics are cheap (atomic increments)

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::AccessLog;
