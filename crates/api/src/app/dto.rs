use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StatusJobRequest {
    pub job_id: String,
}
