//! The per-request pipeline.
//!
//! ```text
//! Request
//!     → decode path → Router::route (first match in registration order)
//!         none  → 404
//!     → resolve identity → authorize (permission table)
//!         denied → 401 (401_PAGE or "unauthorized", WWW-Authenticate)
//!     → read body (bounded) → parse form → Ctx → bind to a fresh resource
//!     → recover(dispatch) → render → merge handler headers
//!     (all of the above bounded by the request timeout: 408)
//!     → AccessLog (on drop)
//! ```

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::{GateConfig, Settings};
use crate::dispatch::{dispatch, recover, InternalFault, Outcome};
use crate::http::request;
use crate::http::response::{self, Rendered};
use crate::observability::AccessLog;
use crate::resource::{authorize, Ctx, PermissionDenied, Prototype};
use crate::routing::{RouteMatch, Router};
use crate::security::{self, IdentityProvider};

/// Fallback body of a 401 when no page is configured.
pub const UNAUTHORIZED_BODY: &str = "unauthorized";

/// Body of the 408 sent when the request timeout elapses.
pub const TIMEOUT_BODY: &str = "request timed out";

/// Route table plus everything needed to serve it.
#[derive(Debug)]
pub struct Gate {
    router: Router,
    identity: Box<dyn IdentityProvider>,
    settings: Settings,
    max_body_bytes: usize,
    request_timeout: Duration,
}

impl Gate {
    pub fn new(router: Router, config: &GateConfig) -> Self {
        for key in config.settings.keys() {
            if key != crate::config::UNAUTHORIZED_PAGE {
                tracing::debug!(key = %key, "Ignoring unknown setting");
            }
        }
        Self {
            router,
            identity: security::from_config(&config.identity),
            settings: config.settings.clone(),
            max_body_bytes: config.limits.max_body_bytes,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        }
    }

    /// Replace the identity provider chosen by configuration.
    pub fn with_identity<P: IdentityProvider + 'static>(mut self, provider: P) -> Self {
        self.identity = Box::new(provider);
        self
    }

    /// Override the request timeout from configuration.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one request end to end.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let method = request.method().clone();
        let raw_path = request.uri().path().to_string();
        let mut log = AccessLog::begin(
            method.clone(),
            raw_path.clone(),
            remote_addr,
            request::request_id(request.headers()),
        );

        let path = request::decode_path(&raw_path);
        let rendered = match self.router.route(&path) {
            None => response::render(Outcome::NotFound),
            Some(matched) => {
                log.matched(matched.entry.pattern().template());
                let served = self.serve(matched, request);
                match tokio::time::timeout(self.request_timeout, served).await {
                    Ok(rendered) => rendered,
                    Err(_) => {
                        tracing::warn!(
                            timeout_ms = self.request_timeout.as_millis() as u64,
                            "Request timed out"
                        );
                        response::plain(StatusCode::REQUEST_TIMEOUT, TIMEOUT_BODY)
                    }
                }
            }
        };

        let bytes = if method == Method::HEAD { 0 } else { rendered.bytes };
        log.finish(rendered.status(), bytes);
        if let Some(fault) = rendered.fault {
            log.fault(fault);
        }
        rendered.response
    }

    async fn serve(&self, matched: RouteMatch<'_>, request: Request<Body>) -> Rendered {
        let RouteMatch { entry, path_params } = matched;
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();

        let user = self.identity.user(&parts);
        let challenge = || self.identity.auth_header(&parts);
        if let Err(denied) = authorize(entry.prototype(), method.as_str(), &user, challenge) {
            return self.unauthorized(denied).await;
        }

        let body = match read_body(body, self.max_body_bytes).await {
            Ok(body) => body,
            Err(rendered) => return rendered,
        };

        let form = request::parse_form(&parts, &body);
        let ctx = Ctx::new(user, parts, form, body, path_params);
        let resource = entry.prototype().instantiate(ctx.clone());

        let outcome = recover(|| dispatch(&method, resource.as_ref()));
        let mut rendered = response::render(outcome);
        rendered.response.headers_mut().extend(ctx.take_response_headers());
        rendered
    }

    async fn unauthorized(&self, denied: PermissionDenied) -> Rendered {
        let mut rendered = match self.settings.unauthorized_page() {
            None => response::plain(StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY),
            Some(page) => match tokio::fs::read(page).await {
                Ok(body) => response::html(StatusCode::UNAUTHORIZED, body),
                Err(e) => {
                    return response::internal(InternalFault::capture(format!(
                        "read 401 page {}: {}",
                        page, e
                    )))
                }
            },
        };

        if !denied.challenge.is_empty() {
            match HeaderValue::from_str(&denied.challenge) {
                Ok(value) => {
                    rendered.response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
                }
                Err(e) => tracing::warn!(error = %e, "Challenge is not a valid header value"),
            }
        }
        rendered
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, Rendered> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!(error = %e, limit, "Rejecting request body");
        response::plain(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    })
}
