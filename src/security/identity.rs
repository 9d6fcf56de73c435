//! Identity providers.
//!
//! The gate never authenticates anyone itself. A provider looks at the
//! request head and reports who is calling (empty string = anonymous) and
//! what challenge to send back when a route refuses an anonymous caller.

use axum::http::request::Parts;

use crate::config::IdentityConfig;

/// Resolves the caller of a request.
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Value for the `WWW-Authenticate` header on a 401.
    fn auth_header(&self, parts: &Parts) -> String;

    /// Caller identity; empty means anonymous.
    fn user(&self, parts: &Parts) -> String;
}

/// Treats every request as anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousProvider;

impl IdentityProvider for AnonymousProvider {
    fn auth_header(&self, _parts: &Parts) -> String {
        String::new()
    }

    fn user(&self, _parts: &Parts) -> String {
        String::new()
    }
}

/// Reads the identity from a header set by a trusted upstream authenticator
/// (e.g. `X-Remote-User` from an auth proxy).
#[derive(Debug, Clone)]
pub struct TrustedHeaderProvider {
    header: String,
    challenge: String,
}

impl TrustedHeaderProvider {
    pub fn new(header: impl Into<String>, challenge: impl Into<String>) -> Self {
        Self {
            header: header.into().to_lowercase(),
            challenge: challenge.into(),
        }
    }
}

impl IdentityProvider for TrustedHeaderProvider {
    fn auth_header(&self, _parts: &Parts) -> String {
        self.challenge.clone()
    }

    fn user(&self, parts: &Parts) -> String {
        parts
            .headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }
}

/// Build the provider selected by configuration.
pub fn from_config(config: &IdentityConfig) -> Box<dyn IdentityProvider> {
    if config.user_header.is_empty() {
        Box::new(AnonymousProvider)
    } else {
        Box::new(TrustedHeaderProvider::new(
            config.user_header.clone(),
            config.challenge.clone(),
        ))
    }
}
