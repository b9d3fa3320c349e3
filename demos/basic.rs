//! Minimal waypost demo: constrained params, a mounted API with its own
//! middleware, an aborting guard and a static fallback.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/user/agus/jakarta
//!   curl http://localhost:3000/api/items/42
//!   curl http://localhost:3000/api/items/abc          # 404, constraint fails
//!   curl -H 'x-api-key: k' http://localhost:3000/api/admin
//!   curl http://localhost:3000/api/admin              # 401 from the guard

use http::StatusCode;
use waypost::{App, Method, Next, Request, Response, Server, Stack};

#[tokio::main]
async fn main() -> Result<(), waypost::Error> {
    tracing_subscriber::fmt::init();

    let api = App::new()
        .middleware(powered_by)
        .get("/items/:id([0-9]+)", get_item)
        .on_with(Method::Get, "/admin", admin, Stack::new().with(require_key));

    let app = App::new()
        .log_requests(true)
        .dependency("greeting", "hello")
        .get("/user/:name/:address", get_user)
        .static_files("public")
        .mount("/api", api);

    Server::bind("0.0.0.0:3000").serve(app).await
}

// GET /user/:name/:address
async fn get_user(req: Request, res: Response) -> Response {
    let greeting = req.dependency::<&str>("greeting").copied().unwrap_or("hi");
    let name = req.param("name").unwrap_or_default();
    let address = req.param("address").unwrap_or_default();
    res.send(format!("{greeting} {name} from {address}"))
}

// GET /api/items/:id
async fn get_item(req: Request, res: Response) -> Response {
    let id = req.param("id").unwrap_or_default();
    res.send_json(format!(r#"{{"id":{id}}}"#))
}

async fn admin(_req: Request, res: Response) -> Response {
    res.send("welcome")
}

// Runs for every request under /api.
async fn powered_by(req: Request, res: Response, next: Next) -> Response {
    next.run(req, res).await.with_header("x-powered-by", "waypost")
}

async fn require_key(req: Request, res: Response, next: Next) -> Response {
    if req.header("x-api-key").is_none() {
        let req = req.abort("missing api key", StatusCode::UNAUTHORIZED);
        return next.run(req, res).await;
    }
    next.run(req, res).await
}
