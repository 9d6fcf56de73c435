//! Values returned by resource capabilities.

use axum::http::StatusCode;
use serde::Serialize;

/// What a capability returns.
pub type HandlerResult = Result<Reply, ResourceError>;

/// Successful payload of a capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 200, `text/plain`.
    Text(String),
    /// 200, `text/html`.
    Html(String),
    /// 200, `application/json`.
    Json(serde_json::Value),
    /// 200 with an explicit content type.
    Bytes { content_type: String, body: Vec<u8> },
    /// 302 to the given location.
    Redirect(String),
    /// 303 to the given location.
    SeeOther(String),
    /// 201 with a `Location` header.
    Created(String),
    /// 204.
    NoContent,
    /// Arbitrary status with a plain-text body.
    Status(StatusCode, String),
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::Html(body.into())
    }

    /// Serialize `value` as the JSON payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ResourceError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| ResourceError::Internal(format!("json encode: {}", e)))
    }

    pub fn bytes(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Self::Text(body)
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Self::Text(body.to_string())
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Expected failures a capability can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    /// Logged with a fault code; the client only sees a generic 500.
    #[error("{0}")]
    Internal(String),
}

impl ResourceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
