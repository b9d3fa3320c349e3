//! Route table.
//!
//! Routes are keyed by method + pattern and looked up by a linear scan that
//! runs every candidate pattern against the request path. The first match
//! wins and scan order is unspecified, so do not register two patterns for
//! the same method that can match the same path (`/users/:id` and
//! `/users/me`, say) and expect either one in particular.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::middleware::BoxedMiddleware;
use crate::pattern::Pattern;

/// Identity of a route: `GET:/users/:id`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RouteKey {
    method: Method,
    pattern: String,
}

impl RouteKey {
    pub fn new(method: Method, pattern: impl Into<String>) -> Self {
        Self { method, pattern: pattern.into() }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn pattern(&self) -> &str { &self.pattern }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.pattern)
    }
}

/// A registered endpoint: handler plus its own middleware.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) method: Method,
    pub(crate) pattern: Arc<Pattern>,
    pub(crate) handler: BoxedHandler,
    pub(crate) middleware: Arc<[BoxedMiddleware]>,
}

impl Route {
    pub(crate) fn key(&self) -> RouteKey {
        RouteKey::new(self.method, self.pattern.as_str())
    }
}

/// Every route of an application.
#[derive(Clone, Default)]
pub(crate) struct RouteTable {
    routes: HashMap<RouteKey, Route>,
}

impl RouteTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `route`, replacing any route with the same key.
    pub(crate) fn insert(&mut self, route: Route) -> Option<Route> {
        self.routes.insert(route.key(), route)
    }

    /// Finds a route registered for `method` whose pattern matches `path`.
    ///
    /// `method` is compared exactly against the uppercase verb.
    pub(crate) fn resolve(&self, method: &str, path: &str) -> Option<&Route> {
        self.routes
            .values()
            .find(|route| route.method.as_str() == method && route.pattern.matches(path))
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    pub(crate) fn into_routes(self) -> impl Iterator<Item = Route> {
        self.routes.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::request::Request;
    use crate::response::Response;

    fn route(method: Method, pattern: &str) -> Route {
        Route {
            method,
            pattern: Arc::new(Pattern::parse(pattern).unwrap()),
            handler: (|_: Request, res: Response| async move { res }).into_boxed_handler(),
            middleware: Arc::from([]),
        }
    }

    #[test]
    fn key_renders_method_and_pattern() {
        assert_eq!(RouteKey::new(Method::Get, "/users/:id").to_string(), "GET:/users/:id");
    }

    #[test]
    fn resolve_requires_method_and_pattern() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/users/:id"));
        table.insert(route(Method::Post, "/users"));

        let found = table.resolve("GET", "/users/7").unwrap();
        assert_eq!(found.key(), RouteKey::new(Method::Get, "/users/:id"));
        assert!(table.resolve("POST", "/users/7").is_none());
        assert!(table.resolve("get", "/users/7").is_none());
        assert!(table.resolve("GET", "/users").is_none());
        assert!(table.resolve("POST", "/users").is_some());
    }

    #[test]
    fn same_key_overwrites() {
        let mut table = RouteTable::new();
        assert!(table.insert(route(Method::Get, "/")).is_none());
        assert!(table.insert(route(Method::Get, "/")).is_some());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn resolve_scans_constrained_patterns() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/user/:id([0-9]+)"));
        assert!(table.resolve("GET", "/user/9").is_some());
        assert!(table.resolve("GET", "/user/agus").is_none());
    }
}
