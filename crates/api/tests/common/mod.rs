use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use nvenc_api::config::ServerConfig;
use nvenc_api::router::build_app_router;
use nvenc_api::state::AppState;
use nvenc_core::gate::{ExecutionGate, ExecutionMode};
use nvenc_core::job::JobRegistry;
use nvenc_core::storage::StorageLayout;

/// Build a test `ServerConfig` rooted at a temp directory.
///
/// `program` is both the required template token and the executable
/// actually invoked, so tests can run real host binaries (`cp`, `sh`)
/// instead of needing ffmpeg installed.
pub fn test_config(root: &Path, mode: ExecutionMode, program: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        storage_root: root.to_path_buf(),
        execution_mode: mode,
        ffmpeg_program: program.to_string(),
        exec_timeout_secs: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        max_upload_mb: 64,
    }
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same stack (CORS, request ID, tracing, body
/// limit, panic recovery) that production uses.
pub fn build_test_app(config: ServerConfig) -> Router {
    let storage = StorageLayout::new(&config.storage_root);
    let state = AppState {
        gate: ExecutionGate::new(config.execution_mode),
        registry: JobRegistry::new(storage),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

pub fn app_with(root: &Path, mode: ExecutionMode, program: &str) -> Router {
    build_test_app(test_config(root, mode, program))
}

/// One GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// One POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

const BOUNDARY: &str = "nvenc-test-boundary";

/// Assemble a `multipart/form-data` body by hand.
///
/// `file` is an optional `(filename, bytes)` pair sent as the `file`
/// field; `fields` are plain text fields.
pub fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// One POST request with a multipart body built by [`multipart_body`].
pub async fn post_multipart(
    app: Router,
    uri: &str,
    body: Vec<u8>,
    extra_headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// Collect a response body into raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response body must be JSON")
}

/// Assert a status code and return the parsed JSON body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
