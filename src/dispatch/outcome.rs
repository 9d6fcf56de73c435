//! The result of handling one matched or unmatched request.

use axum::http::Method;
use std::fmt;
use std::panic::Location;

use crate::resource::{Reply, ResourceError};

/// Body sent to the client for every internal fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Everything the response writer and the access log need to know.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Reply),
    /// Capability returned an expected error (400/403/404/409).
    Failure(ResourceError),
    /// No route matched.
    NotFound,
    /// Route matched but the resource lacks the capability.
    MethodNotAllowed { allowed: Vec<Method> },
    /// Method outside GET, HEAD, POST, PUT, DELETE.
    NotImplemented,
    Internal(InternalFault),
}

impl Outcome {
    pub fn fault(&self) -> Option<&InternalFault> {
        match self {
            Self::Internal(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<Result<Reply, ResourceError>> for Outcome {
    #[track_caller]
    fn from(result: Result<Reply, ResourceError>) -> Self {
        match result {
            Ok(reply) => Self::Success(reply),
            Err(ResourceError::Internal(why)) => Self::Internal(InternalFault::capture(why)),
            Err(err) => Self::Failure(err),
        }
    }
}

/// A recovered fault: what the client is told, and what goes to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalFault {
    /// Caller-facing message.
    pub message: String,
    /// Diagnostic detail (fault text plus trace); never sent to the client.
    pub why: String,
    /// `file:line` of the boundary that produced this fault.
    pub location: String,
    /// Stable code derived from the fault text, for correlating log lines.
    pub code: u32,
}

impl InternalFault {
    /// Fault tagged with the caller's source location.
    #[track_caller]
    pub fn capture(why: impl Into<String>) -> Self {
        let why = why.into();
        Self::at(Location::caller(), &why, why.clone())
    }

    /// Fault whose code derives from `description` and whose detail is `why`.
    pub fn at(location: &Location<'_>, description: &str, why: String) -> Self {
        Self {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            why,
            location: format!("{}:{}", location.file(), location.line()),
            code: fault_code(description),
        }
    }
}

impl fmt::Display for InternalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} {}", self.location, self.code, self.why)
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Same description, same code, on every build: 64-bit FNV-1a of the
/// description, reduced to six digits.
pub fn fault_code(description: &str) -> u32 {
    let hash = description.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    (hash % 1_000_000) as u32
}
