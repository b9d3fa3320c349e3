//! Application builder: the registration surface.
//!
//! Build an [`App`] once at startup, then hand it to
//! [`Server::serve`](crate::Server::serve) or turn it into a
//! [`Dispatcher`] yourself. Nothing can be registered after that point.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::dependency::Dependencies;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::{BoxedMiddleware, Middleware, Stack};
use crate::pattern::Pattern;
use crate::prefix::{Matching, PrefixMap};
use crate::router::{Route, RouteKey, RouteTable};
use crate::static_files::{SERVERLESS_ROOT, StaticDir};
use crate::template::Views;

/// A routable application.
///
/// Every method takes and returns `self` so registrations chain:
///
/// ```rust
/// use waypost::{App, Request, Response};
///
/// # async fn list(_: Request, res: Response) -> Response { res }
/// # async fn show(_: Request, res: Response) -> Response { res }
/// let users = App::new()
///     .get("/", list)
///     .get("/:id([0-9]+)", show);
///
/// let app = App::new()
///     .static_files("public")
///     .mount("/users", users);
/// ```
pub struct App {
    pub(crate) config: Config,
    pub(crate) routes: RouteTable,
    pub(crate) middleware: Vec<BoxedMiddleware>,
    pub(crate) mounted_middleware: PrefixMap<Arc<[BoxedMiddleware]>>,
    pub(crate) static_dir: Option<StaticDir>,
    pub(crate) mounted_static: PrefixMap<StaticDir>,
    pub(crate) templates: Vec<PathBuf>,
    pub(crate) mounted_templates: PrefixMap<Vec<PathBuf>>,
    pub(crate) dependencies: Dependencies,
    pub(crate) context: Option<Context>,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// An app seeded from `config`: static folder, templates, logging,
    /// serverless mode and prefix matching.
    pub fn with_config(config: Config) -> Self {
        let static_dir = config.static_folder.as_ref().map(|folder| {
            StaticDir::new(folder, config.static_path.as_deref().unwrap_or("/"))
        });
        Self {
            routes: RouteTable::new(),
            middleware: Vec::new(),
            mounted_middleware: PrefixMap::new(),
            static_dir,
            mounted_static: PrefixMap::new(),
            templates: config.templates.clone(),
            mounted_templates: PrefixMap::new(),
            dependencies: Dependencies::new(),
            context: None,
            config,
        }
    }

    // ── Routes ───────────────────────────────────────────────────────────────

    /// Registers a handler for a method + pattern pair.
    ///
    /// Registering the same method and pattern again replaces the earlier
    /// route.
    ///
    /// # Panics
    ///
    /// Panics if a `:name(expr)` constraint is not a valid regular expression.
    pub fn on(self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.on_with(method, pattern, handler, Stack::new())
    }

    /// Like [`on`](App::on), with middleware that runs for this route only.
    pub fn on_with(mut self, method: Method, pattern: &str, handler: impl Handler, stack: Stack) -> Self {
        self.routes.insert(Route {
            method,
            pattern: Arc::new(parse(pattern)),
            handler: handler.into_boxed_handler(),
            middleware: stack.into_layers(),
        });
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    pub fn head(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Head, pattern, handler)
    }

    pub fn options(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Options, pattern, handler)
    }

    pub fn connect(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Connect, pattern, handler)
    }

    pub fn trace(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Trace, pattern, handler)
    }

    /// Keys of every registered route, mounted ones included.
    pub fn routes(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    // ── Middleware ───────────────────────────────────────────────────────────

    /// Adds an app-wide middleware layer.
    ///
    /// Layers added later wrap layers added earlier, so they run first. When
    /// this app is mounted, its layers apply to requests under the mount
    /// prefix.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(middleware.into_boxed_middleware());
        self
    }

    // ── Static files & templates ─────────────────────────────────────────────

    /// Serves `folder` under `/` for requests no route matches.
    pub fn static_files(self, folder: impl Into<PathBuf>) -> Self {
        self.static_files_at(folder, "/")
    }

    /// Serves `folder` under the URL path `path`.
    pub fn static_files_at(mut self, folder: impl Into<PathBuf>, path: &str) -> Self {
        self.static_dir = Some(StaticDir::new(folder, path));
        self
    }

    /// Adds a template file. Files are compiled together when the app
    /// becomes a [`Dispatcher`].
    pub fn template(mut self, file: impl Into<PathBuf>) -> Self {
        self.templates.push(file.into());
        self
    }

    // ── Dependencies & context ───────────────────────────────────────────────

    /// Registers a named dependency, readable through
    /// [`Request::dependency`](crate::Request::dependency).
    pub fn dependency<T: std::any::Any + Send + Sync>(mut self, name: &str, value: T) -> Self {
        self.dependencies.insert(name, value);
        self
    }

    /// Replaces the context values of every request with a copy of
    /// `context`'s. Cancellation still follows the transport.
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    // ── Settings ─────────────────────────────────────────────────────────────

    pub fn log_requests(mut self, on: bool) -> Self {
        self.config.log_requests = on;
        self
    }

    pub fn serverless(mut self, on: bool) -> Self {
        self.config.serverless = on;
        self
    }

    /// Caps request bodies buffered by [`Server`](crate::Server), in bytes.
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.config.max_body_size = bytes;
        self
    }

    pub fn prefix_matching(mut self, matching: Matching) -> Self {
        self.config.prefix_matching = matching;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Freezing ─────────────────────────────────────────────────────────────

    /// Compiles templates and freezes the app for serving.
    pub fn into_dispatcher(self) -> Result<Dispatcher, Error> {
        let serverless_root = self.config.serverless.then(|| PathBuf::from(SERVERLESS_ROOT));
        self.freeze(serverless_root)
    }

    /// Freezes the app, resolving template files and static folders under
    /// `serverless_root` when one is given.
    pub(crate) fn freeze(self, serverless_root: Option<PathBuf>) -> Result<Dispatcher, Error> {
        let views = Views::compile(
            &self.templates,
            &self.mounted_templates,
            self.config.prefix_matching,
            serverless_root.as_deref(),
        )?;
        debug!(
            routes = self.routes.len(),
            mounts = self.mounted_middleware.len() + self.mounted_static.len(),
            "dispatcher ready"
        );

        Ok(Dispatcher {
            routes: self.routes,
            middleware: self.middleware.into(),
            mounted_middleware: self.mounted_middleware,
            static_dir: self.static_dir,
            mounted_static: self.mounted_static,
            views: Arc::new(views),
            dependencies: Arc::new(self.dependencies),
            context: self.context,
            log_requests: self.config.log_requests,
            serverless_root,
            matching: self.config.prefix_matching,
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a pattern at registration time; a bad pattern is a startup bug.
pub(crate) fn parse(pattern: &str) -> Pattern {
    Pattern::parse(pattern).unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"))
}
