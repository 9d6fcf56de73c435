//! Resources and their capabilities.
//!
//! # Data Flow
//! ```text
//! Prototype (registered once, read-only)
//!     → materialize.rs (permission check, clone, bind Ctx)
//!     → Box<dyn Resource> (request-scoped)
//!     → dispatch (as_read / as_create / as_replace / as_delete)
//! ```
//!
//! # Design Decisions
//! - Each verb is its own trait; a resource advertises the ones it has
//!   through the `as_*` accessors of [`Resource`]
//! - The two roles the router binds (permission table, context slot) are
//!   declared explicitly by [`Bindable`], never discovered by inspection
//! - Handlers report expected failures through [`ResourceError`]; panics are
//!   only a last-resort path

pub mod context;
pub mod materialize;
pub mod reply;

pub use context::{Cookie, Ctx, Form, SameSite};
pub use materialize::{authorize, materialize, PermissionDenied};
pub use reply::{HandlerResult, Reply, ResourceError};

use crate::security::PermissionTable;

/// GET / HEAD.
pub trait Read {
    fn get(&self) -> HandlerResult;
}

/// POST.
pub trait Create {
    fn post(&self) -> HandlerResult;
}

/// PUT.
pub trait Replace {
    fn put(&self) -> HandlerResult;
}

/// DELETE.
pub trait Delete {
    fn delete(&self) -> HandlerResult;
}

/// A request-scoped resource. Every accessor defaults to "not exposed".
///
/// Usually implemented with [`capabilities!`](crate::capabilities).
pub trait Resource: Send + Sync {
    fn as_read(&self) -> Option<&dyn Read> {
        None
    }

    fn as_create(&self) -> Option<&dyn Create> {
        None
    }

    fn as_replace(&self) -> Option<&dyn Replace> {
        None
    }

    fn as_delete(&self) -> Option<&dyn Delete> {
        None
    }
}

/// Declares the router-bound roles of a resource type.
///
/// The router clones the registered value for every request, so fields other
/// than the context slot travel verbatim into each request.
pub trait Bindable: Resource + Clone + 'static {
    /// Access policy for this resource. `None` makes every method public.
    fn permissions(&self) -> Option<&PermissionTable> {
        None
    }

    /// Store the request context. Resources without a context slot ignore it.
    fn bind_context(&mut self, _ctx: Ctx) {}
}

/// Object-safe view of a registered resource value.
pub trait Prototype: Send + Sync {
    fn permission_table(&self) -> Option<&PermissionTable>;

    /// Produce an independent, context-bound copy.
    fn instantiate(&self, ctx: Ctx) -> Box<dyn Resource>;

    fn type_name(&self) -> &'static str;
}

impl<T: Bindable> Prototype for T {
    fn permission_table(&self) -> Option<&PermissionTable> {
        Bindable::permissions(self)
    }

    fn instantiate(&self, ctx: Ctx) -> Box<dyn Resource> {
        let mut copy = self.clone();
        copy.bind_context(ctx);
        Box::new(copy)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Implement [`Resource`] for a type from the list of verb traits it implements.
///
/// ```ignore
/// capabilities!(UserResource: Read, Delete);
/// ```
#[macro_export]
macro_rules! capabilities {
    (@accessor Read) => {
        fn as_read(&self) -> ::std::option::Option<&dyn $crate::resource::Read> {
            ::std::option::Option::Some(self)
        }
    };
    (@accessor Create) => {
        fn as_create(&self) -> ::std::option::Option<&dyn $crate::resource::Create> {
            ::std::option::Option::Some(self)
        }
    };
    (@accessor Replace) => {
        fn as_replace(&self) -> ::std::option::Option<&dyn $crate::resource::Replace> {
            ::std::option::Option::Some(self)
        }
    };
    (@accessor Delete) => {
        fn as_delete(&self) -> ::std::option::Option<&dyn $crate::resource::Delete> {
            ::std::option::Option::Some(self)
        }
    };
    ($ty:ty $(: $($cap:ident),* $(,)?)?) => {
        impl $crate::resource::Resource for $ty {
            $($( $crate::capabilities!(@accessor $cap); )*)?
        }
    };
}
