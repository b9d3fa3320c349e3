//! Per-request dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::header::USER_AGENT;
use http::request::Parts;
use tracing::{debug, info};

use crate::context::Context;
use crate::dependency::Dependencies;
use crate::middleware::{BoxedMiddleware, Chain};
use crate::prefix::{Matching, PrefixMap};
use crate::request::{RemoteAddr, Request};
use crate::response::Response;
use crate::router::RouteTable;
use crate::static_files::{self, StaticDir};
use crate::template::Views;

/// A frozen application, ready to answer requests.
///
/// Produced by [`App::into_dispatcher`](crate::App::into_dispatcher). The
/// server wraps it in an `Arc` and calls [`serve`](Dispatcher::serve) from
/// every connection task; tests can call it directly without a socket.
pub struct Dispatcher {
    pub(crate) routes: RouteTable,
    pub(crate) middleware: Arc<[BoxedMiddleware]>,
    pub(crate) mounted_middleware: PrefixMap<Arc<[BoxedMiddleware]>>,
    pub(crate) static_dir: Option<StaticDir>,
    pub(crate) mounted_static: PrefixMap<StaticDir>,
    pub(crate) views: Arc<Views>,
    pub(crate) dependencies: Arc<Dependencies>,
    pub(crate) context: Option<Context>,
    pub(crate) log_requests: bool,
    /// Folder prepended to static folders in serverless mode.
    pub(crate) serverless_root: Option<PathBuf>,
    pub(crate) matching: Matching,
}

impl Dispatcher {
    /// Routes one request and produces its response.
    ///
    /// A matching route runs behind the global, mount and route middleware
    /// tiers. Anything else falls through to the static folders, and from
    /// there to `404 Not Found`.
    pub async fn serve(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        if self.log_requests {
            log_request(&parts);
        }

        let serverless = self.serverless_root.is_some();
        let mut request = Request::from_parts(parts, body, Arc::clone(&self.dependencies), serverless);
        if let Some(context) = &self.context {
            let token = request.context().token().clone();
            request = request.with_context(context.clone().rebind(token));
        }

        let Some(route) = self.routes.resolve(request.method().as_str(), request.path()) else {
            debug!(method = %request.method(), path = request.path(), "no route, trying static files");
            return self.serve_static(request.path()).await;
        };

        request.bind_route(Arc::clone(&route.pattern));
        let response = Response::scoped(Arc::clone(&self.views), request.path());

        let mounted = self
            .mounted_middleware
            .resolve(request.path(), Matching::Prefix)
            .map(|(_, layers)| &layers[..]);
        let chain = Chain::from_tiers([Some(&self.middleware[..]), mounted, Some(&route.middleware[..])]);
        debug!(route = %route.key(), layers = chain.len(), "matched");

        chain.run(Arc::clone(&route.handler), request, response).await
    }

    async fn serve_static(&self, path: &str) -> Response {
        let dir = self
            .mounted_static
            .resolve(path, self.matching)
            .map(|(_, dir)| dir)
            .or(self.static_dir.as_ref());
        let Some(dir) = dir else {
            return Response::not_found();
        };

        if let Some(root) = &self.serverless_root {
            let dir = StaticDir::new(root.join(&dir.folder), dir.path.as_str());
            return static_files::serve(&dir, path).await;
        }
        static_files::serve(dir, path).await
    }
}

fn log_request(parts: &Parts) {
    let remote = parts.extensions.get::<RemoteAddr>().map(|r| r.0.to_string());
    let user_agent = parts.headers.get(USER_AGENT).and_then(|v| v.to_str().ok());
    info!(
        method = %parts.method,
        path = parts.uri.path(),
        remote = remote.as_deref().unwrap_or("-"),
        user_agent = user_agent.unwrap_or("-"),
        "request"
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    use http::StatusCode;

    use super::*;
    use crate::app::App;
    use crate::error::Error;
    use crate::middleware::Next;
    use crate::static_files::SERVERLESS_ROOT;

    fn get(uri: &str) -> http::Request<Bytes> {
        http::Request::get(uri).body(Bytes::new()).unwrap()
    }

    async fn hello(_: Request, res: Response) -> Response {
        res.send("hello")
    }

    async fn tag(req: Request, res: Response, next: Next) -> Response {
        next.run(req, res).await.append_header("x-tier", "mount")
    }

    #[tokio::test]
    async fn unmatched_without_static_folder_is_not_found() {
        let dispatcher = App::new().get("/", hello).into_dispatcher().unwrap();
        let res = dispatcher.serve(get("/nope")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), b"404 page not found\n");
    }

    #[tokio::test]
    async fn method_must_match() {
        let dispatcher = App::new().post("/", hello).into_dispatcher().unwrap();
        assert_eq!(dispatcher.serve(get("/")).await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mount_tier_is_selected_by_strict_prefix() {
        let dispatcher = App::new()
            .get("/apix", hello)
            .mount("/api", App::new().middleware(tag).get("/", hello))
            .into_dispatcher()
            .unwrap();

        let res = dispatcher.serve(get("/api")).await;
        assert_eq!(res.headers()["x-tier"], "mount");

        // Prefixes are plain strings.
        let res = dispatcher.serve(get("/apix")).await;
        assert_eq!(res.headers()["x-tier"], "mount");
    }

    #[tokio::test]
    async fn root_routes_skip_the_mount_tier() {
        let dispatcher = App::new()
            .get("/", hello)
            .mount("/api", App::new().middleware(tag).get("/", hello))
            .into_dispatcher()
            .unwrap();
        let res = dispatcher.serve(get("/")).await;
        assert_eq!(res.body(), b"hello");
        assert!(res.headers().get("x-tier").is_none());
    }

    #[tokio::test]
    async fn remote_address_comes_from_the_extensions() {
        async fn peer(req: Request, res: Response) -> Response {
            res.send(req.remote_addr().map(|a| a.to_string()).unwrap_or_default())
        }
        let dispatcher = App::new().get("/", peer).log_requests(true).into_dispatcher().unwrap();

        let mut req = get("/");
        req.extensions_mut().insert(RemoteAddr("10.0.0.1:4000".parse().unwrap()));
        assert_eq!(dispatcher.serve(req).await.body(), b"10.0.0.1:4000");
    }

    #[test]
    fn serverless_flag_selects_the_fixed_root() {
        let dispatcher = App::new().serverless(true).into_dispatcher().unwrap();
        assert_eq!(dispatcher.serverless_root.as_deref(), Some(Path::new(SERVERLESS_ROOT)));
        assert!(App::new().into_dispatcher().unwrap().serverless_root.is_none());
    }

    #[tokio::test]
    async fn serverless_static_folders_live_under_the_root() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("public")).unwrap();
        fs::write(root.path().join("public/x.txt"), "virtual").unwrap();

        let dispatcher = App::new()
            .static_files("public")
            .freeze(Some(root.path().to_path_buf()))
            .unwrap();
        let res = dispatcher.serve(get("/x.txt")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"virtual");
    }

    #[tokio::test]
    async fn serverless_templates_live_under_the_root() {
        async fn page(req: Request, res: Response) -> Result<Response, Error> {
            let serverless = req.is_serverless().to_string();
            res.render_default(&HashMap::from([("serverless", serverless)]))
        }

        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("views")).unwrap();
        fs::write(root.path().join("views/page.html"), "serverless={{ serverless }}").unwrap();

        let dispatcher = App::new()
            .template("views/page.html")
            .get("/", page)
            .freeze(Some(root.path().to_path_buf()))
            .unwrap();
        assert_eq!(dispatcher.serve(get("/")).await.body(), b"serverless=true");
    }
}
