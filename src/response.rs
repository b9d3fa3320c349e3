//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers receive a [`Response`] prepared for their request and return one.
//! Build on the one you were given (`res.with_status(..).send(..)`,
//! `res.render(..)`) or return a fresh one (`Response::text(..)`); both work.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::Error;
use crate::template::{TemplateSet, Views};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values.
pub enum ContentType {
    Css,          // text/css; charset=utf-8
    Html,         // text/html; charset=utf-8
    Javascript,   // text/javascript; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Css         => "text/css; charset=utf-8",
            Self::Html        => "text/html; charset=utf-8",
            Self::Javascript  => "text/javascript; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// Where a response looks for templates: the registry plus the request path
/// that selects a set from it.
#[derive(Clone)]
struct RenderScope {
    views: Arc<Views>,
    path: String,
}

/// An outgoing HTTP response.
///
/// # Shortcuts
///
/// ```rust
/// use http::StatusCode;
/// use waypost::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # On the response a handler receives
///
/// ```rust
/// use http::StatusCode;
/// use waypost::{Request, Response};
///
/// async fn create(_req: Request, res: Response) -> Response {
///     res.with_status(StatusCode::CREATED)
///         .location("/users/42")
///         .send_json(br#"{"id":42}"#.to_vec())
/// }
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    scope: Option<RenderScope>,
}

impl Response {
    /// `200 OK`, no headers, no body.
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: Bytes::new(), scope: None }
    }

    pub(crate) fn scoped(views: Arc<Views>, path: &str) -> Self {
        Self { scope: Some(RenderScope { views, path: path.to_owned() }), ..Self::new() }
    }

    /// `200 OK`, `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().bytes(ContentType::Json, body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::builder().bytes(ContentType::Html, body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, ..Self::new() }
    }

    /// `404 Not Found` with a short plain-text body.
    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "404 page not found")
    }

    /// Plain-text error: `message` plus a trailing newline, with
    /// `X-Content-Type-Options: nosniff`.
    pub fn error(code: StatusCode, message: impl std::fmt::Display) -> Self {
        let mut res = Self::builder().status(code).text(format!("{message}\n"));
        res.headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        res
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn with_status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Sets a header, replacing previous values. Invalid names or values are
    /// logged and dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        put_header(&mut self.headers, name, value, false);
        self
    }

    /// Adds a header value, keeping previous values.
    pub fn append_header(mut self, name: &str, value: &str) -> Self {
        put_header(&mut self.headers, name, value, true);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        self
    }

    pub fn location(self, path: &str) -> Self {
        self.with_header(LOCATION.as_str(), path)
    }

    /// Redirects to `path` with `code` (e.g. `StatusCode::FOUND`).
    pub fn redirect(self, path: &str, code: StatusCode) -> Self {
        self.with_status(code).location(path)
    }

    /// Sets the body, keeping status and headers.
    pub fn send(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body. Serialise with whatever you like; waypost sends bytes.
    pub fn send_json(self, body: impl Into<Bytes>) -> Self {
        self.content_type(ContentType::Json).send(body)
    }

    /// Renders template `name` with `data` as an HTML body.
    ///
    /// The template set is the one mounted under the longest prefix of the
    /// request path, else the application's own set. `data` must serialise
    /// to a map (a struct or a `HashMap`).
    pub fn render(self, name: &str, data: &impl Serialize) -> Result<Self, Error> {
        let html = self.template_set()?.render(name, data)?;
        Ok(self.content_type(ContentType::Html).send(html))
    }

    /// Renders the first template file registered for the selected set.
    pub fn render_default(self, data: &impl Serialize) -> Result<Self, Error> {
        let html = self.template_set()?.render_default(data)?;
        Ok(self.content_type(ContentType::Html).send(html))
    }

    fn template_set(&self) -> Result<&TemplateSet, Error> {
        let scope = self.scope.as_ref().ok_or_else(|| Error::NoTemplate(String::new()))?;
        scope.views.select(&scope.path).ok_or_else(|| Error::NoTemplate(scope.path.clone()))
    }

    /// Converts into the `http` response the transport writes.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn put_header(headers: &mut HeaderMap, name: &str, value: &str, append: bool) {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            if append {
                headers.append(name, value);
            } else {
                headers.insert(name, value);
            }
        }
        _ => warn!(header = name, "dropping invalid response header"),
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        put_header(&mut self.headers, name, value, true);
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.bytes(ContentType::Json, body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        let body: String = body.into();
        self.bytes(ContentType::Text, body)
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        let mut headers = self.headers;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        Response { status: self.status, headers, body: body.into(), scope: None }
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new(), scope: None }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

/// Errors become `500 Internal Server Error` carrying the error text.
impl<T: IntoResponse> IntoResponse for Result<T, Error> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => {
                error!("handler error: {e}");
                Response::error(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_mutators_keep_each_other() {
        let res = Response::new()
            .with_status(StatusCode::CREATED)
            .with_header("x-id", "1")
            .append_header("x-id", "2")
            .location("/users/1")
            .send_json(br#"{"id":1}"#.to_vec());

        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.headers().get_all("x-id").iter().count(), 2);
        assert_eq!(res.headers()["location"], "/users/1");
        assert_eq!(res.headers()["content-type"], "application/json");
        assert_eq!(res.body(), br#"{"id":1}"#);
    }

    #[test]
    fn invalid_headers_are_dropped() {
        let res = Response::new().with_header("bad header", "x").with_header("ok", "bad\nvalue");
        assert!(res.headers().is_empty());
    }

    #[test]
    fn redirect_sets_status_and_location() {
        let res = Response::new().redirect("/login", StatusCode::FOUND);
        assert_eq!(res.status_code(), StatusCode::FOUND);
        assert_eq!(res.headers()["location"], "/login");
    }

    #[test]
    fn render_without_templates_is_an_error() {
        let err = Response::new().render("index.html", &()).unwrap_err();
        assert!(matches!(err, Error::NoTemplate(_)));
    }

    #[test]
    fn errors_convert_to_500() {
        let res = Err::<Response, _>(Error::NoTemplate("/x".into())).into_response();
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"no template set serves `/x`\n");
    }

    #[test]
    fn error_bodies_end_with_a_newline_and_forbid_sniffing() {
        let res = Response::not_found();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), b"404 page not found\n");
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    }

    #[test]
    fn into_http_carries_everything() {
        let res = Response::builder()
            .status(StatusCode::ACCEPTED)
            .header("x-trace", "abc")
            .text("queued")
            .into_http();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(res.headers()["x-trace"], "abc");
        assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    }
}
