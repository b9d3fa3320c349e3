//! Middleware layer.
//!
//! A middleware is any async function of `(Request, Response, Next)`:
//!
//! ```rust
//! use waypost::{Next, Request, Response};
//!
//! async fn server_header(req: Request, res: Response, next: Next) -> Response {
//!     next.run(req, res).await.with_header("server", "waypost")
//! }
//! ```
//!
//! It may rewrite the request before handing it on, rewrite the response on
//! the way back, answer on its own by not calling `next` at all, or stop the
//! chain with an HTTP error through [`Request::abort`].
//!
//! # Tiers
//!
//! Three independent lists feed every request, in this order:
//!
//! 1. **global**: [`App::middleware`](crate::App::middleware), every request
//! 2. **mount**: the global list of the mounted app whose prefix is the
//!    longest literal prefix of the request path
//! 3. **route**: the [`Stack`] given to [`App::on_with`](crate::App::on_with)
//!
//! Inside a tier the *last registered* middleware runs first: each
//! registration adds an outer layer. The innermost layer of one tier hands
//! off to the outermost layer of the next; the innermost layer of the route
//! tier hands off to the handler.

mod chain;

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::StatusCode;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub(crate) use chain::Chain;

// ── Type erasure ──────────────────────────────────────────────────────────────

#[doc(hidden)]
pub trait ErasedMiddleware {
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedMiddleware = Arc<dyn ErasedMiddleware + Send + Sync + 'static>;

/// Implemented for every valid middleware function.
///
/// Satisfied by any `async fn(Request, Response, Next) -> impl IntoResponse`.
/// Sealed like [`Handler`](crate::Handler).
pub trait Middleware: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(FnMiddleware(self))
    }
}

struct FnMiddleware<F>(F);

impl<F, Fut, R> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture {
        let fut = (self.0)(req, res, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Stack ─────────────────────────────────────────────────────────────────────

/// An ordered list of middleware, in registration order.
///
/// ```rust
/// use waypost::{App, Method, Next, Request, Response, Stack};
///
/// # async fn audit(req: Request, res: Response, next: Next) -> Response { next.run(req, res).await }
/// # async fn auth(req: Request, res: Response, next: Next) -> Response { next.run(req, res).await }
/// # async fn admin(_: Request, res: Response) -> Response { res }
/// let app = App::new()
///     .on_with(Method::Get, "/admin", admin, Stack::new().with(audit).with(auth));
/// ```
///
/// Here `auth` runs first and its `next` reaches `audit`.
#[derive(Clone, Default)]
pub struct Stack {
    layers: Vec<BoxedMiddleware>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(middleware.into_boxed_middleware());
        self
    }

    pub fn push(&mut self, middleware: impl Middleware) {
        self.layers.push(middleware.into_boxed_middleware());
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub(crate) fn into_layers(self) -> Arc<[BoxedMiddleware]> {
        self.layers.into()
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack").field("len", &self.layers.len()).finish()
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The continuation handed to every middleware.
///
/// A forward-only cursor over the flattened chain: calling [`Next::run`]
/// invokes the link after the current one, or the handler once the chain is
/// exhausted.
pub struct Next {
    links: Arc<[BoxedMiddleware]>,
    cursor: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(links: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { links, cursor: 0, endpoint }
    }

    /// Hands `req` and `res` to the rest of the chain.
    ///
    /// If `req` carries an error from [`Request::abort`], nothing else runs:
    /// the result is the error response.
    pub async fn run(self, req: Request, res: Response) -> Response {
        if let Some(signal) = req.error_signal() {
            return signal.to_response();
        }
        match self.links.get(self.cursor).cloned() {
            Some(link) => {
                let next = Next { cursor: self.cursor + 1, ..self };
                link.call(req, res, next).await
            }
            None => self.endpoint.call(req, res).await,
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("cursor", &self.cursor)
            .field("links", &self.links.len())
            .finish()
    }
}

// ── ErrorSignal ───────────────────────────────────────────────────────────────

/// An abort request attached to the request context by [`Request::abort`].
///
/// The type is private to the crate, so no application value stored in the
/// context can collide with it.
#[derive(Clone)]
pub(crate) struct ErrorSignal {
    error: Arc<dyn StdError + Send + Sync>,
    status: StatusCode,
}

impl ErrorSignal {
    pub(crate) fn new(error: Box<dyn StdError + Send + Sync>, status: StatusCode) -> Self {
        Self { error: Arc::from(error), status }
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    fn to_response(&self) -> Response {
        Response::error(self.status, &self.error)
    }
}

impl fmt::Display for ErrorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl fmt::Debug for ErrorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSignal")
            .field("status", &self.status)
            .field("error", &self.error.to_string())
            .finish()
    }
}
