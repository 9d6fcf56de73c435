//! Per-request context handed to resources.
//!
//! A `Ctx` is cheap to clone (one `Arc`). The prototype registered with the
//! router carries an unbound `Ctx::default()`; every accessor on an unbound
//! context returns an empty value.

use axum::body::Bytes;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::resource::ResourceError;

/// Parsed form values (query string plus urlencoded body), multi-valued.
pub type Form = HashMap<String, Vec<String>>;

/// Request-scoped view handed to a materialized resource.
#[derive(Clone, Default)]
pub struct Ctx {
    inner: Option<Arc<Inner>>,
}

struct Inner {
    user: String,
    parts: Parts,
    form: Form,
    body: Bytes,
    path_params: HashMap<String, String>,
    response_headers: Mutex<HeaderMap>,
}

impl Ctx {
    pub fn new(
        user: String,
        parts: Parts,
        form: Form,
        body: Bytes,
        path_params: HashMap<String, String>,
    ) -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                user,
                parts,
                form,
                body,
                path_params,
                response_headers: Mutex::new(HeaderMap::new()),
            })),
        }
    }

    /// True once the router has bound this context to a request.
    pub fn is_bound(&self) -> bool {
        self.inner.is_some()
    }

    /// Resolved identity; empty for anonymous callers.
    pub fn user(&self) -> &str {
        self.inner.as_deref().map(|i| i.user.as_str()).unwrap_or("")
    }

    /// The inbound request head.
    pub fn request(&self) -> Option<&Parts> {
        self.inner.as_deref().map(|i| &i.parts)
    }

    pub fn method(&self) -> Option<&Method> {
        self.request().map(|p| &p.method)
    }

    /// Request header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request()?.headers.get(name)?.to_str().ok()
    }

    /// Value of the named request cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.request()?
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// First form value for `key`, or `""`.
    pub fn param(&self, key: &str) -> &str {
        self.param_array(key).first().map(String::as_str).unwrap_or("")
    }

    /// Every form value for `key`, in arrival order.
    pub fn param_array(&self, key: &str) -> &[String] {
        self.inner
            .as_deref()
            .and_then(|i| i.form.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Path placeholder value, or `""` if the route has no such placeholder.
    pub fn path_param(&self, key: &str) -> &str {
        self.inner
            .as_deref()
            .and_then(|i| i.path_params.get(key))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Raw request body.
    pub fn body(&self) -> &[u8] {
        self.inner.as_deref().map(|i| i.body.as_ref()).unwrap_or(&[])
    }

    /// Append a header to the response.
    pub fn add_header(&self, name: &str, value: &str) -> Result<(), ResourceError> {
        let name = HeaderName::try_from(name)
            .map_err(|e| ResourceError::Internal(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| ResourceError::Internal(format!("invalid header value for {}: {}", name, e)))?;
        if let Some(mut headers) = self.response_headers() {
            headers.append(name, value);
        }
        Ok(())
    }

    /// Append a `Set-Cookie` header to the response.
    pub fn set_cookie(&self, cookie: &Cookie) -> Result<(), ResourceError> {
        self.add_header(header::SET_COOKIE.as_str(), &cookie.to_string())
    }

    /// Drain the headers added by the resource.
    pub(crate) fn take_response_headers(&self) -> HeaderMap {
        self.response_headers()
            .map(|mut h| std::mem::take(&mut *h))
            .unwrap_or_default()
    }

    fn response_headers(&self) -> Option<MutexGuard<'_, HeaderMap>> {
        // A handler may have panicked while holding the lock; the headers are still usable.
        self.inner
            .as_deref()
            .map(|i| i.response_headers.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.as_deref() {
            None => f.write_str("Ctx(unbound)"),
            Some(i) => f
                .debug_struct("Ctx")
                .field("user", &i.user)
                .field("method", &i.parts.method)
                .field("path", &i.parts.uri.path())
                .field("path_params", &i.path_params)
                .finish(),
        }
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A response cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Lifetime in seconds; zero or negative deletes the cookie.
    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.max(0))?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        match self.same_site {
            Some(SameSite::Strict) => f.write_str("; SameSite=Strict")?,
            Some(SameSite::Lax) => f.write_str("; SameSite=Lax")?,
            Some(SameSite::None) => f.write_str("; SameSite=None")?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn bound(form: &[(&str, &str)], params: &[(&str, &str)]) -> Ctx {
        let parts = Request::builder()
            .method("POST")
            .uri("/users/42")
            .header("cookie", "session=abc; theme=dark")
            .header("x-trace", "t1")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let mut f = Form::new();
        for (k, v) in form {
            f.entry(k.to_string()).or_default().push(v.to_string());
        }
        let p = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Ctx::new("alice".into(), parts, f, Bytes::from_static(b"raw"), p)
    }

    #[test]
    fn test_unbound_accessors_are_empty() {
        let ctx = Ctx::default();
        assert!(!ctx.is_bound());
        assert_eq!(ctx.user(), "");
        assert_eq!(ctx.param("q"), "");
        assert!(ctx.param_array("q").is_empty());
        assert_eq!(ctx.path_param("id"), "");
        assert!(ctx.body().is_empty());
        assert!(ctx.add_header("x-a", "b").is_ok());
        assert!(ctx.take_response_headers().is_empty());
    }

    #[test]
    fn test_bound_accessors() {
        let ctx = bound(&[("tag", "a"), ("tag", "b"), ("name", "n")], &[("id", "42")]);
        assert_eq!(ctx.user(), "alice");
        assert_eq!(ctx.method(), Some(&Method::POST));
        assert_eq!(ctx.param("tag"), "a");
        assert_eq!(ctx.param_array("tag"), ["a".to_string(), "b".to_string()]);
        assert_eq!(ctx.param("missing"), "");
        assert_eq!(ctx.path_param("id"), "42");
        assert_eq!(ctx.header("x-trace"), Some("t1"));
        assert_eq!(ctx.cookie("theme"), Some("dark"));
        assert_eq!(ctx.cookie("nope"), None);
        assert_eq!(ctx.body(), b"raw".as_slice());
    }

    #[test]
    fn test_response_headers_shared_across_clones() {
        let ctx = bound(&[], &[]);
        let copy = ctx.clone();
        copy.add_header("x-one", "1").unwrap();
        copy.set_cookie(&Cookie::new("s", "v").path("/").http_only(true)).unwrap();
        ctx.set_cookie(&Cookie::new("t", "w")).unwrap();

        let headers = ctx.take_response_headers();
        assert_eq!(headers.get("x-one").unwrap(), "1");
        let cookies: Vec<_> = headers.get_all("set-cookie").iter().collect();
        assert_eq!(cookies.len(), 2);
        assert!(ctx.take_response_headers().is_empty());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let ctx = bound(&[], &[]);
        assert!(ctx.add_header("bad header", "v").is_err());
        assert!(ctx.add_header("x-ok", "line\nbreak").is_err());
    }

    #[test]
    fn test_cookie_display() {
        let c = Cookie::new("id", "7")
            .path("/")
            .domain("example.com")
            .max_age(-5)
            .secure(true)
            .http_only(true)
            .same_site(SameSite::Lax);
        assert_eq!(
            c.to_string(),
            "id=7; Path=/; Domain=example.com; Max-Age=0; HttpOnly; Secure; SameSite=Lax"
        );
    }
}
