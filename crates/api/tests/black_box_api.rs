use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use jobhub_api::app::{self, AppServices};
use jobhub_infra::JobsConfig;
use jobhub_infra::jobs::{InMemoryJobStore, JobSystem};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(work_duration: Duration, queue_capacity: usize) -> Self {
        jobhub_observability::tracing::init_for_tests();

        // Same router as prod, in-memory store, short simulated work.
        let config = JobsConfig {
            queue_capacity,
            work_duration,
            ..JobsConfig::default()
        };
        let system = JobSystem::start(InMemoryJobStore::arc(), &config);
        let app = app::build_app(Arc::new(AppServices::new(system)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_job(client: &reqwest::Client, base_url: &str) -> serde_json::Value {
    let res = client
        .post(format!("{}/create-job", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn status_of(client: &reqwest::Client, base_url: &str, id: &str) -> reqwest::Response {
    client
        .post(format!("{}/status-job", base_url))
        .json(&json!({ "job_id": id }))
        .send()
        .await
        .unwrap()
}

async fn wait_until_completed(
    client: &reqwest::Client,
    base_url: &str,
    id: &str,
) -> serde_json::Value {
    for _ in 0..200 {
        let res = status_of(client, base_url, id).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        if body["status"] == "completed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("job {id} did not complete within timeout");
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn(Duration::from_millis(10), 5).await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["executor"]["jobs_dispatched"].is_u64());
}

#[tokio::test]
async fn create_returns_pending_job() {
    let srv = TestServer::spawn(Duration::from_millis(200), 5).await;
    let client = reqwest::Client::new();

    let job = create_job(&client, &srv.base_url).await;
    assert_eq!(job["status"], "pending");
    assert_eq!(job["createAt"], job["updateAt"]);
    assert!(job["id"].as_str().is_some());
}

#[tokio::test]
async fn job_is_pending_then_completed() {
    let srv = TestServer::spawn(Duration::from_millis(100), 5).await;
    let client = reqwest::Client::new();

    let created = create_job(&client, &srv.base_url).await;
    let id = created["id"].as_str().unwrap().to_string();

    let res = status_of(&client, &srv.base_url, &id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let immediate: serde_json::Value = res.json().await.unwrap();
    assert_eq!(immediate["status"], "pending");

    let done = wait_until_completed(&client, &srv.base_url, &id).await;
    assert_eq!(done["createAt"], created["createAt"]);
    assert_ne!(done["updateAt"], done["createAt"]);

    let res = client
        .get(format!("{}/jobs/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let via_path: serde_json::Value = res.json().await.unwrap();
    assert_eq!(via_path, done);
}

#[tokio::test]
async fn ten_jobs_all_complete() {
    let srv = TestServer::spawn(Duration::from_millis(20), 5).await;
    let client = reqwest::Client::new();

    let mut ids = HashSet::new();
    for _ in 0..10 {
        let job = create_job(&client, &srv.base_url).await;
        ids.insert(job["id"].as_str().unwrap().to_string());
    }
    assert_eq!(ids.len(), 10);

    for id in &ids {
        wait_until_completed(&client, &srv.base_url, id).await;
    }
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let srv = TestServer::spawn(Duration::from_millis(10), 5).await;
    let client = reqwest::Client::new();

    let res = status_of(&client, &srv.base_url, "nonexistent-id").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client
        .get(format!("{}/jobs/{}", srv.base_url, "0b7f4c7e-2f55-4d8e-9d3e-6b1a1c0f2a11"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_status_body_is_bad_request() {
    let srv = TestServer::spawn(Duration::from_millis(10), 5).await;
    let client = reqwest::Client::new();

    for body in ["not json", "{}", r#"{"job_id": 42}"#] {
        let res = client
            .post(format!("{}/status-job", srv.base_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body}");
        let err: serde_json::Value = res.json().await.unwrap();
        assert_eq!(err["error"], "invalid_request");
    }
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let srv = TestServer::spawn(Duration::from_millis(10), 5).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/create-job", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let res = client
        .get(format!("{}/status-job", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}
