//! Response writing.
//!
//! # Responsibilities
//! - Map an [`Outcome`] to status, headers and body bytes
//! - Report the body size to the access log
//! - Keep fault diagnostics out of the client-facing body
//!
//! # Design Decisions
//! - Every internal fault gets the same generic body
//! - A reply that cannot be turned into a valid response (bad header value,
//!   unserializable JSON) degrades to a 500 carrying its own fault

use axum::body::Body;
use axum::http::header::{self, HeaderName};
use axum::http::{Method, StatusCode};
use axum::response::Response;

use crate::dispatch::{InternalFault, Outcome, INTERNAL_ERROR_MESSAGE};
use crate::resource::Reply;

const TEXT: &str = "text/plain; charset=utf-8";
const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

/// Body of the default 404.
pub const NOT_FOUND_BODY: &str = "404 page not found";

/// A response ready to send, plus what the access log needs from it.
#[derive(Debug)]
pub struct Rendered {
    pub response: Response,
    pub bytes: usize,
    /// Fault behind a 500, if any.
    pub fault: Option<InternalFault>,
}

impl Rendered {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }
}

/// Turn a dispatch outcome into a response.
pub fn render(outcome: Outcome) -> Rendered {
    match outcome {
        Outcome::Success(reply) => render_reply(reply),
        Outcome::Failure(err) => plain(err.status(), err.to_string()),
        Outcome::NotFound => plain(StatusCode::NOT_FOUND, NOT_FOUND_BODY),
        Outcome::MethodNotAllowed { allowed } => {
            let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            build(
                StatusCode::METHOD_NOT_ALLOWED,
                vec![(header::CONTENT_TYPE, TEXT.to_string()), (header::ALLOW, allow)],
                b"method not allowed".to_vec(),
            )
        }
        Outcome::NotImplemented => plain(StatusCode::NOT_IMPLEMENTED, "not implemented"),
        Outcome::Internal(fault) => internal(fault),
    }
}

fn render_reply(reply: Reply) -> Rendered {
    match reply {
        Reply::Text(body) => typed(StatusCode::OK, TEXT, body.into_bytes()),
        Reply::Html(body) => typed(StatusCode::OK, HTML, body.into_bytes()),
        Reply::Json(value) => match serde_json::to_vec(&value) {
            Ok(body) => typed(StatusCode::OK, JSON, body),
            Err(e) => internal(InternalFault::capture(format!("json encode: {}", e))),
        },
        Reply::Bytes { content_type, body } => typed(StatusCode::OK, &content_type, body),
        Reply::Redirect(location) => located(StatusCode::FOUND, location),
        Reply::SeeOther(location) => located(StatusCode::SEE_OTHER, location),
        Reply::Created(location) => located(StatusCode::CREATED, location),
        Reply::NoContent => build(StatusCode::NO_CONTENT, Vec::new(), Vec::new()),
        Reply::Status(status, body) => plain(status, body),
    }
}

/// Plain-text response.
pub fn plain(status: StatusCode, body: impl Into<String>) -> Rendered {
    typed(status, TEXT, body.into().into_bytes())
}

/// HTML response.
pub fn html(status: StatusCode, body: Vec<u8>) -> Rendered {
    typed(status, HTML, body)
}

/// The generic 500 for `fault`.
pub fn internal(fault: InternalFault) -> Rendered {
    let mut rendered = plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE);
    rendered.fault = Some(fault);
    rendered
}

fn typed(status: StatusCode, content_type: &str, body: Vec<u8>) -> Rendered {
    build(status, vec![(header::CONTENT_TYPE, content_type.to_string())], body)
}

fn located(status: StatusCode, location: String) -> Rendered {
    build(status, vec![(header::LOCATION, location)], Vec::new())
}

fn build(status: StatusCode, headers: Vec<(HeaderName, String)>, body: Vec<u8>) -> Rendered {
    let bytes = body.len();
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    match builder.body(Body::from(body)) {
        Ok(response) => Rendered {
            response,
            bytes,
            fault: None,
        },
        Err(e) => internal(InternalFault::capture(format!("invalid response: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceError;

    fn header_of<'a>(r: &'a Rendered, name: HeaderName) -> Option<&'a str> {
        r.response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_reply_statuses() {
        let cases = [
            (Reply::text("hi"), StatusCode::OK),
            (Reply::html("<p>hi</p>"), StatusCode::OK),
            (Reply::Redirect("/a".into()), StatusCode::FOUND),
            (Reply::SeeOther("/a".into()), StatusCode::SEE_OTHER),
            (Reply::Created("/notes/1".into()), StatusCode::CREATED),
            (Reply::NoContent, StatusCode::NO_CONTENT),
            (Reply::Status(StatusCode::ACCEPTED, "queued".into()), StatusCode::ACCEPTED),
        ];
        for (reply, status) in cases {
            assert_eq!(render(Outcome::Success(reply)).status(), status);
        }
    }

    #[test]
    fn test_text_and_json_bodies() {
        let r = render(Outcome::Success(Reply::text("hello")));
        assert_eq!(r.bytes, 5);
        assert_eq!(header_of(&r, header::CONTENT_TYPE), Some(TEXT));

        let r = render(Outcome::Success(Reply::Json(serde_json::json!({"id": "42"}))));
        assert_eq!(header_of(&r, header::CONTENT_TYPE), Some(JSON));
        assert_eq!(r.bytes, br#"{"id":"42"}"#.len());
    }

    #[test]
    fn test_created_sets_location() {
        let r = render(Outcome::Success(Reply::Created("/notes/7".into())));
        assert_eq!(header_of(&r, header::LOCATION), Some("/notes/7"));
        assert_eq!(r.bytes, 0);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let r = render(Outcome::MethodNotAllowed {
            allowed: vec![Method::GET, Method::HEAD],
        });
        assert_eq!(r.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(header_of(&r, header::ALLOW), Some("GET, HEAD"));
    }

    #[test]
    fn test_error_outcomes() {
        assert_eq!(render(Outcome::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(render(Outcome::NotImplemented).status(), StatusCode::NOT_IMPLEMENTED);

        let r = render(Outcome::Failure(ResourceError::Conflict("taken".into())));
        assert_eq!(r.status(), StatusCode::CONFLICT);
        assert_eq!(r.bytes, 5);
    }

    #[test]
    fn test_internal_hides_diagnostic() {
        let fault = InternalFault::capture("secret detail");
        let r = render(Outcome::Internal(fault.clone()));
        assert_eq!(r.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(r.bytes, INTERNAL_ERROR_MESSAGE.len());
        assert_eq!(r.fault, Some(fault));
    }

    #[test]
    fn test_invalid_location_degrades() {
        let r = render(Outcome::Success(Reply::Redirect("/bad\nvalue".into())));
        assert_eq!(r.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(r.fault.is_some());
    }
}
