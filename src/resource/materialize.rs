//! Producing a request-scoped resource from its prototype.

use std::fmt;

use crate::resource::{Ctx, Prototype, Resource};
use crate::security::permission::Access;

/// The permission table refused the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenied {
    /// Value for the `WWW-Authenticate` header.
    pub challenge: String,
    pub method: String,
    pub required: Access,
}

impl fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {:?} access", self.method, self.required)
    }
}

impl std::error::Error for PermissionDenied {}

/// Check the prototype's permission table against the bound request, then
/// return a fresh copy of the prototype holding `ctx`.
///
/// `challenge` is only evaluated on denial. The prototype is never mutated.
pub fn materialize<F>(
    prototype: &dyn Prototype,
    ctx: Ctx,
    challenge: F,
) -> Result<Box<dyn Resource>, PermissionDenied>
where
    F: FnOnce() -> String,
{
    let method = ctx.method().map(|m| m.as_str()).unwrap_or_default();
    authorize(prototype, method, ctx.user(), challenge)?;
    Ok(prototype.instantiate(ctx))
}

/// The permission check alone, for callers that want to refuse a request
/// before buffering its body.
pub fn authorize<F>(
    prototype: &dyn Prototype,
    method: &str,
    user: &str,
    challenge: F,
) -> Result<(), PermissionDenied>
where
    F: FnOnce() -> String,
{
    let Some(table) = prototype.permission_table() else {
        return Ok(());
    };
    if table.allows(method, user) {
        return Ok(());
    }

    tracing::debug!(method = %method, required = ?table.required(method), "Permission denied");
    Err(PermissionDenied {
        challenge: challenge(),
        method: method.to_string(),
        required: table.required(method),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities;
    use crate::resource::{Bindable, HandlerResult, Read, Reply};
    use crate::security::permission::{PermissionTable, WILDCARD};
    use axum::body::Bytes;
    use axum::http::Request;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct Profile {
        ctx: Ctx,
        perm: PermissionTable,
        greeting: String,
    }

    impl Read for Profile {
        fn get(&self) -> HandlerResult {
            Ok(Reply::text(format!("{} {}", self.greeting, self.ctx.path_param("id"))))
        }
    }

    capabilities!(Profile: Read);

    impl Bindable for Profile {
        fn permissions(&self) -> Option<&PermissionTable> {
            Some(&self.perm)
        }

        fn bind_context(&mut self, ctx: Ctx) {
            self.ctx = ctx;
        }
    }

    fn prototype(perm: PermissionTable) -> Profile {
        Profile {
            ctx: Ctx::default(),
            perm,
            greeting: "hello".into(),
        }
    }

    fn ctx(method: &str, user: &str, id: &str) -> Ctx {
        let parts = Request::builder()
            .method(method)
            .uri(format!("/profiles/{}", id))
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let params = HashMap::from([("id".to_string(), id.to_string())]);
        Ctx::new(user.into(), parts, Default::default(), Bytes::new(), params)
    }

    #[test]
    fn test_binds_context_and_copies_other_fields() {
        let proto = prototype(PermissionTable::new());
        let resource = materialize(&proto, ctx("GET", "", "7"), String::new).unwrap();
        let reply = resource.as_read().unwrap().get().unwrap();
        assert_eq!(reply, Reply::text("hello 7"));
        assert!(!proto.ctx.is_bound(), "prototype must stay unbound");
    }

    #[test]
    fn test_denied_without_identity() {
        let proto = prototype(PermissionTable::new().with(WILDCARD, Access::Authenticated));
        let err = materialize(&proto, ctx("POST", "", "1"), || "Basic realm=\"x\"".into())
            .err()
            .unwrap();
        assert_eq!(err.challenge, "Basic realm=\"x\"");
        assert_eq!(err.method, "POST");
        assert_eq!(err.required, Access::Authenticated);

        assert!(materialize(&proto, ctx("POST", "alice", "1"), String::new).is_ok());
    }

    #[test]
    fn test_challenge_only_evaluated_on_denial() {
        let proto = prototype(PermissionTable::new());
        let result = materialize(&proto, ctx("GET", "", "1"), || panic!("not needed"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_materializations_are_independent() {
        let proto = prototype(PermissionTable::new());
        let first = materialize(&proto, ctx("GET", "", "1"), String::new).unwrap();
        let first_reply = first.as_read().unwrap().get().unwrap();

        let second = materialize(&proto, ctx("GET", "", "2"), String::new).unwrap();
        assert_eq!(second.as_read().unwrap().get().unwrap(), Reply::text("hello 2"));

        assert_eq!(first.as_read().unwrap().get().unwrap(), first_reply);
        assert_eq!(first_reply, Reply::text("hello 1"));
    }

    #[test]
    fn test_authorize_without_context() {
        let proto = prototype(PermissionTable::new().with("PUT", Access::Authenticated));
        assert!(authorize(&proto, "GET", "", String::new).is_ok());
        assert!(authorize(&proto, "PUT", "dave", String::new).is_ok());

        let err = authorize(&proto, "PUT", "", || "Bearer".into()).unwrap_err();
        assert_eq!(err.challenge, "Bearer");
        assert_eq!(err.required, Access::Authenticated);
    }
}
