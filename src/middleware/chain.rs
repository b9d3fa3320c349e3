//! Flattening middleware tiers into one chain.

use std::sync::Arc;

use super::{BoxedMiddleware, Next};
use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;

/// The effective middleware sequence for one request.
///
/// Built from an ordered list of optional tiers. Absent and empty tiers
/// contribute nothing; every other tier contributes its layers last-registered
/// first.
pub(crate) struct Chain {
    links: Vec<BoxedMiddleware>,
}

impl Chain {
    pub(crate) fn from_tiers<'a>(
        tiers: impl IntoIterator<Item = Option<&'a [BoxedMiddleware]>>,
    ) -> Self {
        let links = tiers
            .into_iter()
            .flatten()
            .flat_map(|tier| tier.iter().rev().cloned())
            .collect();
        Self { links }
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    /// Runs the chain, ending in `endpoint`.
    ///
    /// With no layers at all the endpoint is called directly.
    pub(crate) async fn run(self, endpoint: BoxedHandler, req: Request, res: Response) -> Response {
        if self.links.is_empty() {
            return endpoint.call(req, res).await;
        }
        let links: Arc<[BoxedMiddleware]> = self.links.into();
        Next::new(links, endpoint).run(req, res).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use http::StatusCode;

    use super::*;
    use crate::handler::Handler;
    use crate::middleware::Middleware;
    use crate::request::tests::request;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn layer(log: &Log, name: &'static str) -> BoxedMiddleware {
        let log = Arc::clone(log);
        (move |req: Request, res: Response, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                next.run(req, res).await
            }
        })
        .into_boxed_middleware()
    }

    fn endpoint(log: &Log) -> BoxedHandler {
        let log = Arc::clone(log);
        (move |_req: Request, _res: Response| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("handler");
                Response::text("handled")
            }
        })
        .into_boxed_handler()
    }

    fn aborting() -> BoxedMiddleware {
        (|req: Request, res: Response, next: Next| async move {
            let req = req.abort("upstream down", StatusCode::BAD_GATEWAY);
            next.run(req, res).await
        })
        .into_boxed_middleware()
    }

    #[tokio::test]
    async fn tiers_run_in_order_and_last_registered_first_within_a_tier() {
        let log = Log::default();
        let global = [layer(&log, "g1"), layer(&log, "g2")];
        let mount = [layer(&log, "m1")];
        let route = [layer(&log, "r1"), layer(&log, "r2")];

        let chain = Chain::from_tiers([Some(&global[..]), Some(&mount[..]), Some(&route[..])]);
        assert_eq!(chain.len(), 5);
        let res = chain.run(endpoint(&log), request("GET", "/"), Response::new()).await;

        assert_eq!(res.body(), b"handled");
        assert_eq!(*log.lock().unwrap(), ["g2", "g1", "m1", "r2", "r1", "handler"]);
    }

    #[tokio::test]
    async fn missing_tiers_are_skipped() {
        let log = Log::default();
        let route = [layer(&log, "r1")];

        let chain = Chain::from_tiers([Some(&[] as &[BoxedMiddleware]), None, Some(&route[..])]);
        chain.run(endpoint(&log), request("GET", "/"), Response::new()).await;

        assert_eq!(*log.lock().unwrap(), ["r1", "handler"]);
    }

    #[tokio::test]
    async fn no_layers_calls_the_endpoint_directly() {
        let log = Log::default();
        let chain = Chain::from_tiers([None, None, None]);
        assert_eq!(chain.len(), 0);

        let res = chain.run(endpoint(&log), request("GET", "/"), Response::new()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["handler"]);
    }

    #[tokio::test]
    async fn abort_stops_every_later_tier_and_the_handler() {
        let log = Log::default();
        let global = [aborting()];
        let route = [layer(&log, "r1")];

        let chain = Chain::from_tiers([Some(&global[..]), None, Some(&route[..])]);
        let res = chain.run(endpoint(&log), request("GET", "/"), Response::new()).await;

        assert_eq!(res.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(res.body(), b"upstream down\n");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn abort_inside_a_tier_skips_its_inner_layers() {
        let log = Log::default();
        // Registered first, so it runs after the aborting layer.
        let global = [layer(&log, "inner"), aborting()];

        let chain = Chain::from_tiers([Some(&global[..])]);
        let res = chain.run(endpoint(&log), request("GET", "/"), Response::new()).await;

        assert_eq!(res.status_code(), StatusCode::BAD_GATEWAY);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_layer_may_answer_without_calling_next() {
        let log = Log::default();
        let deny = (|_req: Request, _res: Response, _next: Next| async {
            Response::status(StatusCode::FORBIDDEN)
        })
        .into_boxed_middleware();
        let global = [deny];

        let chain = Chain::from_tiers([Some(&global[..])]);
        let res = chain.run(endpoint(&log), request("GET", "/"), Response::new()).await;

        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn values_handed_to_next_reach_the_handler() {
        #[derive(Clone)]
        struct User(&'static str);

        let annotate = (|mut req: Request, res: Response, next: Next| async move {
            req.context_mut().insert(User("agus"));
            next.run(req, res.with_header("x-seen", "1")).await
        })
        .into_boxed_middleware();
        let handler = (|req: Request, res: Response| async move {
            let user = req.context().get::<User>().map_or("anonymous", |u| u.0);
            res.send(user)
        })
        .into_boxed_handler();
        let global = [annotate];

        let res = Chain::from_tiers([Some(&global[..])])
            .run(handler, request("GET", "/"), Response::new())
            .await;

        assert_eq!(res.body(), b"agus");
        assert_eq!(res.headers()["x-seen"], "1");
    }
}
