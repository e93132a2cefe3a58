use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use jobhub_infra::JobError;

pub fn job_error_to_response(err: JobError) -> axum::response::Response {
    let status = match err {
        JobError::NotFound(_) => StatusCode::NOT_FOUND,
        JobError::StoreWrite(_)
        | JobError::StoreRead(_)
        | JobError::UpdateRace(_)
        | JobError::QueueClosed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.kind(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
