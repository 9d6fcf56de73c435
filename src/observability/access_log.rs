//! Per-request access log.
//!
//! An [`AccessLog`] is opened when the gate starts handling a request and
//! emits exactly one record when dropped. If the handling future is dropped
//! before a status was recorded (the client went away) the record says so
//! instead of inventing a status. Timeouts are answered by the gate itself
//! and logged with their 408.

use axum::http::{Method, StatusCode};
use std::net::SocketAddr;
use std::time::Instant;

use crate::dispatch::InternalFault;
use crate::observability::metrics::{self, UNMATCHED};

/// Log target for access records; filter on it to split them out.
pub const TARGET: &str = "resource_gate::access";

#[derive(Debug)]
pub struct AccessLog {
    start: Instant,
    method: Method,
    path: String,
    remote_addr: Option<SocketAddr>,
    request_id: String,
    route: Option<String>,
    status: Option<StatusCode>,
    bytes: usize,
    fault: Option<InternalFault>,
}

impl AccessLog {
    pub fn begin(
        method: Method,
        path: impl Into<String>,
        remote_addr: Option<SocketAddr>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            start: Instant::now(),
            method,
            path: path.into(),
            remote_addr,
            request_id: request_id.into(),
            route: None,
            status: None,
            bytes: 0,
            fault: None,
        }
    }

    /// Template of the matched route.
    pub fn matched(&mut self, template: &str) {
        self.route = Some(template.to_string());
    }

    pub fn fault(&mut self, fault: InternalFault) {
        self.fault = Some(fault);
    }

    /// Status and body size written to the client.
    pub fn finish(&mut self, status: StatusCode, bytes: usize) {
        self.status = Some(status);
        self.bytes = bytes;
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    fn remote(&self) -> String {
        self.remote_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl Drop for AccessLog {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let remote_addr = self.remote();

        let Some(status) = self.status else {
            if std::thread::panicking() {
                tracing::error!(
                    target: TARGET,
                    remote_addr = %remote_addr,
                    method = %self.method,
                    path = %self.path,
                    elapsed_ms,
                    request_id = %self.request_id,
                    "request aborted by a panic outside the dispatch boundary"
                );
                return;
            }
            tracing::warn!(
                target: TARGET,
                remote_addr = %remote_addr,
                method = %self.method,
                path = %self.path,
                elapsed_ms,
                request_id = %self.request_id,
                "client disconnected"
            );
            return;
        };

        let route = self.route.as_deref().unwrap_or(UNMATCHED);
        metrics::record_request(self.method.as_str(), status.as_u16(), route, self.start);

        match &self.fault {
            Some(fault) => tracing::error!(
                target: TARGET,
                remote_addr = %remote_addr,
                method = %self.method,
                path = %self.path,
                status = status.as_u16(),
                elapsed_ms,
                bytes = self.bytes,
                request_id = %self.request_id,
                fault_where = %fault.location,
                fault_code = fault.code,
                fault_why = %fault.why,
                "{}",
                fault.message
            ),
            None => tracing::info!(
                target: TARGET,
                remote_addr = %remote_addr,
                method = %self.method,
                path = %self.path,
                status = status.as_u16(),
                elapsed_ms,
                bytes = self.bytes,
                request_id = %self.request_id,
                "request"
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Formatted log output collected in memory.
    #[derive(Clone, Default)]
    pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub(crate) fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::TRACE)
                .finish()
        }

        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::capture::Captured;
    use super::*;

    #[test]
    fn test_records_progress() {
        let mut log = AccessLog::begin(Method::GET, "/users/1", None, "req-1");
        assert_eq!(log.status(), None);
        assert_eq!(log.remote(), "-");

        log.matched("/users/{id}");
        log.finish(StatusCode::OK, 12);
        assert_eq!(log.status(), Some(StatusCode::OK));
        assert_eq!(log.route.as_deref(), Some("/users/{id}"));
        assert_eq!(log.bytes, 12);
    }

    #[test]
    fn test_drop_without_status_logs_disconnect() {
        let capture = Captured::default();
        tracing::subscriber::with_default(capture.subscriber(), || {
            let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
            drop(AccessLog::begin(Method::POST, "/x", Some(addr), "req-2"));
        });

        let out = capture.contents();
        assert!(out.contains("client disconnected"), "{}", out);
        assert!(out.contains("remote_addr=127.0.0.1:4000"), "{}", out);
        assert!(out.contains("request_id=req-2"), "{}", out);
        assert!(!out.contains("status="), "{}", out);
        assert_eq!(out.lines().count(), 1, "{}", out);
    }

    #[test]
    fn test_fault_record_carries_diagnostics() {
        let fault = InternalFault::capture("disk full");
        let capture = Captured::default();
        tracing::subscriber::with_default(capture.subscriber(), || {
            let mut log = AccessLog::begin(Method::GET, "/users/1", None, "req-3");
            log.matched("/users/{id}");
            log.finish(StatusCode::INTERNAL_SERVER_ERROR, 21);
            log.fault(fault.clone());
        });

        let out = capture.contents();
        assert!(out.contains("ERROR"), "{}", out);
        assert!(out.contains("status=500"), "{}", out);
        assert!(out.contains("bytes=21"), "{}", out);
        assert!(out.contains(&format!("fault_code={}", fault.code)), "{}", out);
        assert!(out.contains(&format!("fault_where={}", fault.location)), "{}", out);
        assert!(out.contains("fault_why=disk full"), "{}", out);
        assert!(!out.contains("client disconnected"), "{}", out);
    }

    #[test]
    fn test_success_record_is_info() {
        let capture = Captured::default();
        tracing::subscriber::with_default(capture.subscriber(), || {
            let mut log = AccessLog::begin(Method::GET, "/health", None, "req-4");
            log.finish(StatusCode::OK, 2);
        });

        let out = capture.contents();
        assert!(out.contains("INFO"), "{}", out);
        assert!(out.contains("status=200"), "{}", out);
        assert!(!out.contains("fault_code"), "{}", out);
    }
}
