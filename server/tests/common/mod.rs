#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use exifrelay_server::config::ServerConfig;
use exifrelay_server::state::AppState;
use http_body_util::BodyExt;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "exifrelay-test-boundary";

/// A test server whose jobs run `tool`, with its own scratch directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

pub fn test_config(tool: &str, dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        upload_dir: dir.path().join("uploads"),
        examples_file: dir.path().join("examples.json"),
        tool: tool.to_string(),
        retention_secs: 60,
        message_capacity: 16,
        max_upload_mb: 1,
    }
}

pub fn build_test_app(tool: &str) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
    let state = AppState::new(test_config(tool, &dir));
    let router = exifrelay_server::app(state.clone());
    TestApp { router, state, dir }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_form(app: &TestApp, uri: &str, form: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &TestApp, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn upload(app: &TestApp, field: &str, filename: &str, content: &str) -> Response<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\
         \r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload_file")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Collect a whole body; streaming bodies are bounded by a timeout.
pub async fn body_text(response: Response<Body>) -> String {
    let collected = tokio::time::timeout(Duration::from_secs(10), response.into_body().collect())
        .await
        .expect("body did not finish")
        .unwrap();
    String::from_utf8(collected.to_bytes().to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Submit a job and return its id.
pub async fn submit(app: &TestApp, form: &str) -> String {
    let response = post_form(app, "/run_exiftool", form).await;
    assert_eq!(response.status(), 200);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    json["process_id"].as_str().unwrap().to_string()
}

pub async fn wait_for_terminal_status(app: &TestApp, id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let json = body_json(get(app, &format!("/job_status/{id}")).await).await;
        if json["status"] != "running" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {id} never finished");
}
