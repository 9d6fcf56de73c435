//! Ordered route table.
//!
//! # Responsibilities
//! - Compile every template once, at construction
//! - Look up the first route whose pattern matches a path
//! - Hand back the prototype and the extracted path parameters
//!
//! # Design Decisions
//! - Immutable after construction (shared via `Arc`, no locks)
//! - Registration order is the only precedence: a catch-all registered
//!   first shadows everything after it
//! - Any template error fails construction; there is no partial table

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::resource::Prototype;
use crate::routing::pattern::{PatternError, RoutePattern};

/// A route template that failed to compile.
#[derive(Debug, thiserror::Error)]
#[error("route #{index} ({template:?}): {source}")]
pub struct SetupError {
    pub index: usize,
    pub template: String,
    #[source]
    pub source: PatternError,
}

/// A template paired with the resource that serves it.
pub struct RouteRule {
    pub template: String,
    pub prototype: Arc<dyn Prototype>,
}

impl RouteRule {
    pub fn new<P: Prototype + 'static>(template: impl Into<String>, prototype: P) -> Self {
        Self {
            template: template.into(),
            prototype: Arc::new(prototype),
        }
    }
}

impl fmt::Debug for RouteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRule")
            .field("template", &self.template)
            .field("resource", &self.prototype.type_name())
            .finish()
    }
}

/// A compiled route.
pub struct RouteEntry {
    pattern: RoutePattern,
    prototype: Arc<dyn Prototype>,
}

impl RouteEntry {
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn prototype(&self) -> &dyn Prototype {
        self.prototype.as_ref()
    }
}

/// Result of a successful lookup.
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub path_params: HashMap<String, String>,
}

impl RouteMatch<'_> {
    pub fn template(&self) -> &str {
        self.entry.pattern.template()
    }

    pub fn prototype(&self) -> &dyn Prototype {
        self.entry.prototype()
    }
}

/// Immutable, ordered route table.
pub struct Router {
    entries: Vec<RouteEntry>,
}

impl Router {
    /// Compile `rules` in order.
    pub fn new(rules: Vec<RouteRule>) -> Result<Self, SetupError> {
        let entries = rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| {
                let pattern = RoutePattern::compile(&rule.template).map_err(|source| SetupError {
                    index,
                    template: rule.template.clone(),
                    source,
                })?;
                Ok(RouteEntry {
                    pattern,
                    prototype: rule.prototype,
                })
            })
            .collect::<Result<Vec<_>, SetupError>>()?;

        tracing::info!(
            routes_count = entries.len(),
            routes = ?entries.iter().map(|e| e.pattern.template()).collect::<Vec<_>>(),
            "Route table compiled"
        );

        Ok(Self { entries })
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// First entry whose pattern matches `path`, in registration order.
    pub fn route(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.entries.iter().find_map(|entry| {
            entry.pattern.matches(path).map(|params| RouteMatch {
                entry,
                path_params: params.into_iter().collect(),
            })
        })
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.pattern.template()))
            .finish()
    }
}

/// Collects route rules in registration order.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    rules: Vec<RouteRule>,
}

impl RouterBuilder {
    pub fn route<P: Prototype + 'static>(mut self, template: impl Into<String>, prototype: P) -> Self {
        self.rules.push(RouteRule::new(template, prototype));
        self
    }

    pub fn build(self) -> Result<Router, SetupError> {
        Router::new(self.rules)
    }
}
