use axum::{routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

// The detail, share and comment routes share their first path segment, so
// it carries the same parameter name in all three; on the detail route it
// holds the publish year.
pub fn blog() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::post_list))
        .route("/:id/:month/:day/:slug/", get(handlers::post_detail))
        .route(
            "/:id/share/",
            get(handlers::share_form).post(handlers::share_submit),
        )
        .route("/:id/comment/", post(handlers::post_comment))
        .route("/tag/:slug/", get(handlers::post_list_by_tag))
        .route("/search/", get(handlers::post_search))
}

pub fn syndication() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(handlers::sitemap))
        .route("/feed/", get(handlers::feed))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/authors", post(handlers::create_author))
        .route("/admin/posts", post(handlers::create_post))
        .route("/admin/posts/:id", patch(handlers::update_post))
}
