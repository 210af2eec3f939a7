use crate::server::ServerRouter;
use axum::{Router, routing::get};

mod posts;
mod users;

pub const LIVENESS_MESSAGE: &str = "Path Finder Server Running!!";

pub fn routes() -> ServerRouter {
    Router::new()
        .route("/", get(|| async { LIVENESS_MESSAGE }))
        .merge(posts::routes())
        .merge(users::routes())
}
