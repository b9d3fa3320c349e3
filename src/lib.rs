//! # waypost
//!
//! Pattern routing, tiered middleware and mountable sub-applications on top
//! of hyper.
//!
//! ## Routing
//!
//! Patterns are split on `/` and compared segment by segment. A segment is
//! either a literal or a parameter, optionally constrained by a regular
//! expression:
//!
//! | Pattern | Matches | Does not match |
//! |---|---|---|
//! | `/users` | `/users` | `/users/7` |
//! | `/users/:id` | `/users/7` | `/users/` |
//! | `/users/:id([0-9]+)` | `/users/7` | `/users/me` |
//!
//! A request that matches no route falls through to the static folder, if
//! one is configured, and from there to `404 Not Found`.
//!
//! ## Middleware
//!
//! Every matched request runs through three tiers: app-wide middleware, the
//! middleware of the mounted app owning the path, and the route's own
//! [`Stack`]. See [`middleware`] for the ordering rules.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use waypost::{App, Next, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waypost::Error> {
//!     let api = App::new()
//!         .middleware(require_key)
//!         .get("/users/:id([0-9]+)", get_user);
//!
//!     let app = App::new()
//!         .static_files("public")
//!         .mount("/api", api);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn require_key(req: Request, res: Response, next: Next) -> Response {
//!     if req.header("x-api-key").is_none() {
//!         let req = req.abort("missing api key", StatusCode::UNAUTHORIZED);
//!         return next.run(req, res).await;
//!     }
//!     next.run(req, res).await
//! }
//!
//! async fn get_user(req: Request, res: Response) -> Response {
//!     let id = req.param("id").unwrap_or_default();
//!     res.send_json(format!(r#"{{"id":{id}}}"#))
//! }
//! ```

mod app;
mod config;
mod context;
mod dependency;
mod dispatch;
mod error;
mod handler;
mod method;
mod mount;
mod pattern;
mod prefix;
mod request;
mod response;
mod router;
mod server;
mod static_files;
mod template;

pub mod middleware;

pub use app::App;
pub use config::Config;
pub use context::Context;
pub use dependency::Dependencies;
pub use dispatch::Dispatcher;
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use middleware::{Middleware, Next, Stack};
pub use pattern::Pattern;
pub use prefix::{Matching, PrefixMap};
pub use request::{RemoteAddr, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::RouteKey;
pub use server::Server;
pub use static_files::SERVERLESS_ROOT;
