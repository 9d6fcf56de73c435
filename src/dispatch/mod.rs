//! Capability dispatch.
//!
//! # Data Flow
//! ```text
//! (method, materialized resource)
//!     → Capability::for_method (GET/HEAD → read, POST → create, ...)
//!     → resource.as_*() present?  yes → invoke → Outcome::Success / Failure / Internal
//!                                 no  → Outcome::MethodNotAllowed { allowed }
//!     → unknown method → Outcome::NotImplemented
//! ```
//!
//! `recovery::recover` wraps exactly this call in the request path.

pub mod outcome;
pub mod recovery;

pub use outcome::{fault_code, InternalFault, Outcome, INTERNAL_ERROR_MESSAGE};
pub use recovery::recover;

use axum::http::Method;

use crate::resource::Resource;

/// The verb roles a resource can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Create,
    Replace,
    Delete,
}

impl Capability {
    /// All capabilities, in `Allow` header order.
    pub const ALL: [Capability; 4] = [Self::Read, Self::Create, Self::Replace, Self::Delete];

    pub fn for_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Self::Read),
            Method::POST => Some(Self::Create),
            Method::PUT => Some(Self::Replace),
            Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }

    /// Methods served by this capability.
    pub fn methods(self) -> &'static [Method] {
        static READ: [Method; 2] = [Method::GET, Method::HEAD];
        static CREATE: [Method; 1] = [Method::POST];
        static REPLACE: [Method; 1] = [Method::PUT];
        static DELETE: [Method; 1] = [Method::DELETE];
        match self {
            Self::Read => &READ,
            Self::Create => &CREATE,
            Self::Replace => &REPLACE,
            Self::Delete => &DELETE,
        }
    }

    pub fn exposed_by(self, resource: &dyn Resource) -> bool {
        match self {
            Self::Read => resource.as_read().is_some(),
            Self::Create => resource.as_create().is_some(),
            Self::Replace => resource.as_replace().is_some(),
            Self::Delete => resource.as_delete().is_some(),
        }
    }
}

/// Methods the resource answers, in stable order.
pub fn allowed_methods(resource: &dyn Resource) -> Vec<Method> {
    Capability::ALL
        .into_iter()
        .filter(|cap| cap.exposed_by(resource))
        .flat_map(|cap| cap.methods().iter().cloned())
        .collect()
}

/// Invoke the capability for `method` on `resource`.
pub fn dispatch(method: &Method, resource: &dyn Resource) -> Outcome {
    let Some(capability) = Capability::for_method(method) else {
        return Outcome::NotImplemented;
    };

    let result = match capability {
        Capability::Read => resource.as_read().map(|r| r.get()),
        Capability::Create => resource.as_create().map(|r| r.post()),
        Capability::Replace => resource.as_replace().map(|r| r.put()),
        Capability::Delete => resource.as_delete().map(|r| r.delete()),
    };

    match result {
        Some(result) => Outcome::from(result),
        None => Outcome::MethodNotAllowed {
            allowed: allowed_methods(resource),
        },
    }
}
