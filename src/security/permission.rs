//! Per-route, per-method access policy.
//!
//! # Responsibilities
//! - Map HTTP method names (or `*`) to a required access level
//! - Decide whether an identity may invoke a method
//!
//! # Design Decisions
//! - A method without an entry falls back to `*`
//! - No entry at all means the method is public
//! - Evaluation is a pure function of (table, method, identity)

use std::collections::HashMap;

/// Method key matching every method without its own entry.
pub const WILDCARD: &str = "*";

/// Access level required to invoke a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// No identity required.
    #[default]
    Public,
    /// A non-empty identity is required.
    Authenticated,
}

/// Method name → required access level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    rules: HashMap<String, Access>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table requiring authentication for every method.
    pub fn authenticated() -> Self {
        Self::new().with(WILDCARD, Access::Authenticated)
    }

    /// Add or replace the rule for `method`.
    pub fn with(mut self, method: impl Into<String>, access: Access) -> Self {
        self.rules.insert(method.into(), access);
        self
    }

    /// Required access for `method`, with wildcard fallback.
    pub fn required(&self, method: &str) -> Access {
        self.rules
            .get(method)
            .or_else(|| self.rules.get(WILDCARD))
            .copied()
            .unwrap_or(Access::Public)
    }

    /// Returns true unless authentication is required and `identity` is empty.
    pub fn allows(&self, method: &str, identity: &str) -> bool {
        allowed(self, method, identity)
    }
}

impl<K: Into<String>> FromIterator<(K, Access)> for PermissionTable {
    fn from_iter<I: IntoIterator<Item = (K, Access)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Decide whether `identity` may invoke `method` under `table`.
pub fn allowed(table: &PermissionTable, method: &str, identity: &str) -> bool {
    !(table.required(method) == Access::Authenticated && identity.is_empty())
}
