use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use jobhub_infra::JobError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.registry.create().await {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "create job failed");
            errors::job_error_to_response(e)
        }
    }
}

/// A missing content type and malformed JSON both answer 400.
pub async fn status_job(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    let req: dto::StatusJobRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", e.to_string());
        }
    };
    lookup(&services, &req.job_id).await
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    lookup(&services, &job_id).await
}

async fn lookup(services: &AppServices, job_id: &str) -> axum::response::Response {
    match services.status.status(job_id).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => {
            if !matches!(e, JobError::NotFound(_)) {
                tracing::error!(job_id = %job_id, error = %e, "status lookup failed");
            }
            errors::job_error_to_response(e)
        }
    }
}
