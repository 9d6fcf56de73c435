//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gate mounted as its fallback
//! - Wire up middleware (request ID, tracing, panic safety net)
//! - Bind the listener and serve until shutdown is signalled

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::gate::Gate;
use crate::http::request::MakeRequestUuid;

/// Errors from binding or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the gate.
pub struct HttpServer {
    router: Router,
    gate: Arc<Gate>,
}

impl HttpServer {
    /// Create a new HTTP server serving `gate`.
    ///
    /// The request timeout is enforced by the gate, so a timed-out request
    /// still gets its own access record.
    pub fn new(gate: Gate) -> Self {
        let gate = Arc::new(gate);
        let router = Self::build_router(gate.clone());
        Self { router, gate }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(gate: Arc<Gate>) -> Router {
        Router::new()
            .fallback(gate_handler)
            .with_state(gate)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(CatchPanicLayer::new())
    }

    /// The fully layered application, for driving in-process.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServeError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.gate.router().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Bind a TCP listener on `address`.
pub async fn bind(address: &str) -> Result<TcpListener, ServeError> {
    TcpListener::bind(address).await.map_err(|source| ServeError::Bind {
        address: address.to_string(),
        source,
    })
}

async fn gate_handler(State(gate): State<Arc<Gate>>, request: Request<Body>) -> Response {
    gate.handle(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities;
    use crate::config::GateConfig;
    use crate::resource::{Bindable, HandlerResult, Read, Reply};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct Hello;

    impl Read for Hello {
        fn get(&self) -> HandlerResult {
            Ok(Reply::text("hello"))
        }
    }

    capabilities!(Hello: Read);
    impl Bindable for Hello {}

    fn server() -> HttpServer {
        let config = GateConfig::default();
        let router = crate::routing::Router::builder()
            .route("/hello", Hello)
            .build()
            .unwrap();
        HttpServer::new(Gate::new(router, &config))
    }

    #[tokio::test]
    async fn test_request_id_generated_and_propagated() {
        let response = server()
            .app()
            .oneshot(Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_client_request_id_kept() {
        let response = server()
            .app()
            .oneshot(
                Request::get("/missing")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_bind_error_names_address() {
        let err = bind("no-port-here").await.unwrap_err();
        assert!(err.to_string().contains("no-port-here"));
    }
}
