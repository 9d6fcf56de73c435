//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → request.rs (request ID, path decoding, form parsing)
//!     → gate.rs (route, authorize, materialize, dispatch)
//!     → response.rs (outcome → status, headers, body)
//!     → Send to client
//! ```

pub mod gate;
pub mod request;
pub mod response;
pub mod server;

pub use gate::Gate;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::Rendered;
pub use server::{bind, HttpServer, ServeError};
