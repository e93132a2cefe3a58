use axum::{
    Router,
    routing::{get, post},
};

pub mod jobs;
pub mod system;

/// Router for the job endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/create-job", post(jobs::create_job))
        .route("/status-job", post(jobs::status_job))
        .route("/jobs/:job_id", get(jobs::get_job))
}
