//! Request-scoped context: typed values plus a cancellation token.
//!
//! The transport hands every request a token derived from the server's
//! shutdown token. waypost only carries it; handlers that care about
//! cancellation check [`Context::is_cancelled`] or await
//! [`Context::cancelled`]. Nothing in the dispatch path reacts to it.

use http::Extensions;
use tokio_util::sync::CancellationToken;

/// Values and cancellation carried with one request.
#[derive(Clone, Debug, Default)]
pub struct Context {
    values: Extensions,
    token: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context cancelled together with `token`.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { values: Extensions::new(), token }
    }

    /// Adds a value, replacing any previous value of the same type.
    pub fn with_value<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.insert(value);
        self
    }

    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get::<T>()
    }

    /// The same values, cancelled together with `token` instead.
    pub(crate) fn rebind(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the request has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
