//! HTTP surface for running jobs on demand.

pub mod routes;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/{job}/invoke", post(routes::invoke_job))
        .with_state(state)
}
