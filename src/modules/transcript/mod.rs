use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use crate::state::AppState;

pub mod dto;
pub mod events;
pub mod handler;
pub mod keys;
pub mod model;
pub mod reconciler;

pub fn router(state: AppState) -> Router<AppState> {
    let upload_routes = Router::new()
        .route("/upload", post(handler::upload_file))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .route("/", get(handler::upload_form))
        .route("/artifact/{key}", get(handler::get_artifact))
        .route(reconciler::WEBHOOK_PATH, post(handler::webhook))
        .route("/job/{job_id}", get(handler::poll_job))
        .merge(upload_routes)
}
