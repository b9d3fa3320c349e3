//! Incoming HTTP request type.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use http::request::Parts;
use percent_encoding::percent_decode_str;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::dependency::Dependencies;
use crate::middleware::ErrorSignal;
use crate::pattern::Pattern;

/// Peer address of the connection a request arrived on.
///
/// The server stores it in the `http::Request` extensions; anything else
/// driving [`Dispatcher::serve`](crate::Dispatcher::serve) may do the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// An incoming HTTP request.
///
/// Built fresh by the dispatcher for every request and moved through the
/// middleware chain. Whatever a middleware passes to
/// [`Next::run`](crate::Next::run) is what the rest of the chain sees.
#[derive(Debug)]
pub struct Request {
    method: http::Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    route: Option<Arc<Pattern>>,
    serverless: bool,
    dependencies: Arc<Dependencies>,
    context: Context,
}

impl Request {
    pub(crate) fn from_parts(
        mut parts: Parts,
        body: Bytes,
        dependencies: Arc<Dependencies>,
        serverless: bool,
    ) -> Self {
        let remote_addr = parts.extensions.get::<RemoteAddr>().map(|r| r.0);
        let token = parts.extensions.remove::<CancellationToken>().unwrap_or_default();
        Self {
            method: parts.method,
            path: decode_path(parts.uri.path()),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            remote_addr,
            route: None,
            serverless,
            dependencies,
            context: Context::with_token(token),
        }
    }

    pub(crate) fn bind_route(&mut self, pattern: Arc<Pattern>) {
        self.route = Some(pattern);
    }

    pub fn method(&self) -> &http::Method { &self.method }
    /// The percent-decoded request path.
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }
    pub fn is_serverless(&self) -> bool { self.serverless }

    /// Case-insensitive header lookup. Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    /// The pattern of the route this request was dispatched to.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref().map(Pattern::as_str)
    }

    /// Path parameter values, in pattern order.
    ///
    /// For a route `/user/:name/:address` and the path `/user/agus/jakarta`:
    ///
    /// | Call | Result |
    /// |---|---|
    /// | `params(&[])` | `["agus", "jakarta"]` |
    /// | `params(&["name"])` | `["agus"]` |
    /// | `params(&["name", "address"])` | `[]` |
    pub fn params(&self, names: &[&str]) -> Vec<&str> {
        match &self.route {
            Some(pattern) => pattern.params(&self.path, names),
            None => Vec::new(),
        }
    }

    /// Returns a single named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params(&[name]).into_iter().next()
    }

    pub fn context(&self) -> &Context { &self.context }
    pub fn context_mut(&mut self) -> &mut Context { &mut self.context }

    /// Replaces the request context.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Returns the dependency registered under `name` if it is a `T`.
    pub fn dependency<T: std::any::Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.dependencies.get(name)
    }

    /// Registers a dependency for the rest of this request only.
    ///
    /// The shared registry is copied on first write, so other requests never
    /// observe the value.
    pub fn set_dependency<T: std::any::Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> &mut Self {
        Arc::make_mut(&mut self.dependencies).insert(name, value);
        self
    }

    /// Marks the request so the middleware chain stops at the next hand-off.
    ///
    /// Pass the result to `next.run`: the chain answers with `status` and the
    /// error text as body, and neither later middleware nor the handler runs.
    ///
    /// ```rust
    /// use http::StatusCode;
    /// use waypost::{Next, Request, Response};
    ///
    /// async fn require_token(req: Request, res: Response, next: Next) -> Response {
    ///     if req.header("authorization").is_none() {
    ///         let req = req.abort("missing token", StatusCode::UNAUTHORIZED);
    ///         return next.run(req, res).await;
    ///     }
    ///     next.run(req, res).await
    /// }
    /// ```
    pub fn abort(
        mut self,
        error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
        status: http::StatusCode,
    ) -> Self {
        self.context.insert(ErrorSignal::new(error.into(), status));
        self
    }

    pub(crate) fn error_signal(&self) -> Option<&ErrorSignal> {
        self.context.get::<ErrorSignal>()
    }
}

/// Percent-decodes a request path. A path that does not decode to UTF-8 is
/// kept as it arrived.
fn decode_path(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(path) => path.into_owned(),
        Err(_) => raw.to_owned(),
    }
}
