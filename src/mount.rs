//! Mounting one app under a path prefix of another.
//!
//! A mounted app is absorbed, not nested: its routes are re-registered on the
//! parent under `prefix + pattern`, and everything else it carries (its own
//! middleware, static folder, template files) is parked in the parent's
//! per-prefix maps where the dispatcher looks it up by request path.
//!
//! | Child pattern | Prefix | Registered as |
//! |---|---|---|
//! | `/` | `/api` | `/api` |
//! | `/items` | `/api` | `/api/items` |
//! | `/` | `""` | `/` |

use std::sync::Arc;

use crate::app::{App, parse};
use crate::middleware::BoxedMiddleware;
use crate::router::Route;
use crate::static_files::join;

impl App {
    /// Absorbs `child` under `prefix`.
    ///
    /// The child's app-wide middleware becomes mount middleware: it runs for
    /// every request whose path starts with `prefix`, between this app's
    /// middleware and the route's own. Its static folder is served under
    /// `prefix` + its static path, and its templates render responses for
    /// paths under `prefix`. Child dependencies are merged in; on a name clash
    /// this app's value is kept. Child settings (logging, serverless mode,
    /// prefix matching, context) are ignored.
    ///
    /// Apps mounted into `child` move along with it, re-keyed under `prefix`.
    pub fn mount(mut self, prefix: &str, child: App) -> Self {
        let App {
            routes,
            middleware,
            mounted_middleware,
            static_dir,
            mounted_static,
            templates,
            mounted_templates,
            dependencies,
            ..
        } = child;

        for route in routes.into_routes() {
            let pattern = join(prefix, route.pattern.as_str());
            self.routes.insert(Route { pattern: Arc::new(parse(&pattern)), ..route });
        }

        // A grandchild's tier replaces the child's for its own paths, so the
        // child's layers are folded in underneath it.
        for (key, layers) in mounted_middleware {
            let outer = middleware.iter().cloned();
            let combined: Arc<[BoxedMiddleware]> = layers.iter().cloned().chain(outer).collect();
            self.mounted_middleware.insert(format!("{prefix}{key}"), combined);
        }
        if !middleware.is_empty() {
            self.mounted_middleware.insert(prefix, middleware.into());
        }

        if let Some(dir) = static_dir {
            self.mounted_static.insert(prefix, dir.mounted_at(prefix));
        }
        for (key, dir) in mounted_static {
            self.mounted_static.insert(format!("{prefix}{key}"), dir.mounted_at(prefix));
        }

        if !templates.is_empty() {
            self.mounted_templates.insert(prefix, templates);
        }
        for (key, files) in mounted_templates {
            self.mounted_templates.insert(format!("{prefix}{key}"), files);
        }

        self.dependencies.absorb(dependencies);
        self
    }

    /// Builds a fresh app with `build` and mounts it under `prefix`.
    ///
    /// ```rust
    /// use waypost::{App, Request, Response};
    ///
    /// # async fn list(_: Request, res: Response) -> Response { res }
    /// let app = App::new().register("/items", |items| items.get("/", list));
    /// assert!(app.routes().any(|k| k.to_string() == "GET:/items"));
    /// ```
    pub fn register(self, prefix: &str, build: impl FnOnce(App) -> App) -> Self {
        self.mount(prefix, build(App::new()))
    }
}
