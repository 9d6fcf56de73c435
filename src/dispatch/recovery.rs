//! Panic recovery around capability dispatch.
//!
//! # Responsibilities
//! - Run the dispatch closure under `catch_unwind`
//! - Turn a caught panic into `Outcome::Internal` with message, trace and code
//! - Keep recovered panics out of stderr; they go to the access log instead
//!
//! # Design Decisions
//! - A process-wide panic hook records the panic message and a backtrace in a
//!   thread-local while a boundary is active on that thread; outside any
//!   boundary it defers to the previously installed hook
//! - The fault location is where `recover` was called, not where the panic
//!   originated (the origin is part of the trace)

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Once;

use crate::dispatch::outcome::{InternalFault, Outcome};

/// Separator between the fault text and each trace frame.
pub const TRACE_SEPARATOR: &str = "\n\t";

/// Frames kept in the diagnostic trace.
const MAX_TRACE_LINES: usize = 48;

static HOOK: Once = Once::new();

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

struct Captured {
    message: String,
    origin: Option<String>,
    trace: String,
}

/// Run `f`, converting any panic into an internal-error outcome.
#[track_caller]
pub fn recover<F>(f: F) -> Outcome
where
    F: FnOnce() -> Outcome,
{
    let location = Location::caller();
    install_hook();

    let result = {
        let _boundary = Boundary::enter();
        panic::catch_unwind(AssertUnwindSafe(f))
    };

    match result {
        Ok(outcome) => outcome,
        Err(payload) => {
            let fault = fault_from_panic(location, payload.as_ref());
            tracing::error!(
                fault_location = %fault.location,
                fault_code = fault.code,
                "Recovered panic in resource handler"
            );
            metrics::counter!("gate_faults_total").increment(1);
            Outcome::Internal(fault)
        }
    }
}

fn fault_from_panic(location: &Location<'_>, payload: &(dyn Any + Send)) -> InternalFault {
    let captured = CAPTURED.with(|c| c.borrow_mut().take());
    let (message, origin, trace) = match captured {
        Some(c) => (c.message, c.origin, c.trace),
        None => (
            payload_message(payload),
            None,
            Backtrace::force_capture().to_string(),
        ),
    };

    let mut why = message.clone();
    if let Some(origin) = origin {
        why.push_str(" at ");
        why.push_str(&origin);
    }
    for line in trace.lines().map(str::trim).filter(|l| !l.is_empty()).take(MAX_TRACE_LINES) {
        why.push_str(TRACE_SEPARATOR);
        why.push_str(line);
    }

    InternalFault::at(location, &message, why)
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let captured = Captured {
                message: payload_message(info.payload()),
                origin: info.location().map(|l| format!("{}:{}", l.file(), l.line())),
                trace: Backtrace::force_capture().to_string(),
            };
            CAPTURED.with(|c| *c.borrow_mut() = Some(captured));
        }));
    });
}

/// Marks the current thread as inside a recovery boundary.
struct Boundary;

impl Boundary {
    fn enter() -> Self {
        DEPTH.with(|d| d.set(d.get() + 1));
        CAPTURED.with(|c| c.borrow_mut().take());
        Boundary
    }
}

impl Drop for Boundary {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::outcome::fault_code;
    use crate::resource::Reply;

    #[test]
    fn test_passes_through_normal_outcome() {
        let outcome = recover(|| Outcome::Success(Reply::text("ok")));
        assert_eq!(outcome, Outcome::Success(Reply::text("ok")));
    }

    #[test]
    fn test_converts_str_panic() {
        let outcome = recover(|| panic!("boom"));
        let fault = outcome.fault().expect("fault");
        assert!(fault.why.starts_with("boom"), "{}", fault.why);
        assert_eq!(fault.code, fault_code("boom"));
        assert!(fault.location.starts_with(file!()), "{}", fault.location);
    }

    #[test]
    fn test_converts_formatted_panic_with_trace() {
        let id = 42;
        let outcome = recover(|| panic!("no user {}", id));
        let fault = outcome.fault().expect("fault");
        assert!(fault.why.starts_with("no user 42"));
        assert!(fault.why.contains(TRACE_SEPARATOR));
        assert_eq!(fault.code, fault_code("no user 42"));
    }

    #[test]
    fn test_location_is_constant_per_call_site() {
        let run = |msg: &'static str| recover(move || panic!("{}", msg));
        let a = run("first");
        let b = run("second");
        assert_eq!(a.fault().unwrap().location, b.fault().unwrap().location);
        assert_ne!(a.fault().unwrap().code, b.fault().unwrap().code);
    }

    #[test]
    fn test_nested_boundaries() {
        let outcome = recover(|| {
            let inner = recover(|| panic!("inner"));
            assert!(inner.fault().is_some());
            Outcome::NotFound
        });
        assert_eq!(outcome, Outcome::NotFound);
    }
}
