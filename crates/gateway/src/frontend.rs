//! The chat page: language picker, "Start New Chat", transcript and composer.
//!
//! `frontend/` is compiled into the binary with `include_str!`, so
//! `lingochat serve` needs nothing on disk. Scripts and styles are served
//! from `/static/{file}`. Anything not in [`ASSETS`] is a 404.

use axum::{
    Router,
    extract::Path,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};

const INDEX_HTML: &str = include_str!("../../../frontend/index.html");

/// One embedded file under `/static/`.
struct Asset {
    file: &'static str,
    content_type: &'static str,
    body: &'static str,
}

const ASSETS: &[Asset] = &[
    Asset {
        file: "style.css",
        content_type: "text/css; charset=utf-8",
        body: include_str!("../../../frontend/style.css"),
    },
    Asset {
        file: "app.js",
        content_type: "application/javascript; charset=utf-8",
        body: include_str!("../../../frontend/app.js"),
    },
];

fn find_asset(file: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|asset| asset.file == file)
}

/// Build a router that serves the embedded page and its assets.
pub fn frontend_router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/{file}", get(asset_handler))
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn asset_handler(Path(file): Path<String>) -> Response {
    match find_asset(&file) {
        Some(asset) => (
            [
                (header::CONTENT_TYPE, asset.content_type),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            asset.body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
