use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod forms;
mod handlers;
mod routes;
mod views;

pub use auth::AdminToken;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::blog())
        .merge(routes::syndication())
        .merge(routes::admin())
        .with_state(state)
}
