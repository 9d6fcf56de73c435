//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Percent-decode the path before route matching
//! - Parse form values from the query string and urlencoded bodies
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body form values come before query values for the same key
//! - A path that does not decode to UTF-8 is matched undecoded

use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::request::{Parts, Request};
use axum::http::Method;
use std::borrow::Cow;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::resource::Form;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// The request ID header value, or `"-"`.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Percent-decoded request path.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(_) => {
            tracing::debug!(path = %path, "Path is not valid UTF-8 once decoded; matching raw");
            Cow::Borrowed(path)
        }
    }
}

/// Form values from an urlencoded body (POST, PUT, PATCH) followed by the
/// query string.
pub fn parse_form(parts: &Parts, body: &[u8]) -> Form {
    let mut form = Form::new();

    if carries_form_body(parts) {
        append_pairs(&mut form, body);
    }
    if let Some(query) = parts.uri.query() {
        append_pairs(&mut form, query.as_bytes());
    }
    form
}

fn carries_form_body(parts: &Parts) -> bool {
    let method_ok = matches!(parts.method, Method::POST | Method::PUT | Method::PATCH);
    method_ok
        && parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}

fn append_pairs(form: &mut Form, input: &[u8]) {
    for (key, value) in url::form_urlencoded::parse(input) {
        form.entry(key.into_owned()).or_default().push(value.into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderName;

    fn parts(method: Method, uri: &str, content_type: Option<&str>) -> Parts {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_query_only() {
        let p = parts(Method::GET, "/search?q=rust&tag=a&tag=b", None);
        let form = parse_form(&p, b"ignored=1");
        assert_eq!(form["q"], vec!["rust"]);
        assert_eq!(form["tag"], vec!["a", "b"]);
        assert!(!form.contains_key("ignored"));
    }

    #[test]
    fn test_body_values_precede_query() {
        let p = parts(
            Method::POST,
            "/notes?title=from-query",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
        );
        let form = parse_form(&p, b"title=from+body&body=hello%21");
        assert_eq!(form["title"], vec!["from body", "from-query"]);
        assert_eq!(form["body"], vec!["hello!"]);
    }

    #[test]
    fn test_non_form_body_ignored() {
        let p = parts(Method::POST, "/notes", Some("application/json"));
        assert!(parse_form(&p, b"{\"a\":1}").is_empty());
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/users/j%C3%B6rg"), "/users/jörg");
        assert_eq!(decode_path("/plain"), "/plain");
        assert_eq!(decode_path("/bad/%FF"), "/bad/%FF");
    }

    #[test]
    fn test_request_id_generation() {
        let req = Request::builder().body(()).unwrap();
        let id = MakeRequestUuid.make_request_id(&req).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(text).is_ok());

        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "-");
        headers.insert(HeaderName::from_static(X_REQUEST_ID), HeaderValue::from_static("abc"));
        assert_eq!(request_id(&headers), "abc");
    }
}
