use super::mocks::MockLlmClient;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use mql2promql::{
    convert::{Converter, ConverterSettings},
    server::{AppState, build_router},
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

/// Bytes served as the favicon in router tests.
pub const FAVICON_BYTES: &[u8] = b"\x00\x00\x01\x00test-icon";

/// Builds the full router around `mock`. The returned directory holds the
/// favicon and must outlive the router.
pub fn create_test_app(mock: MockLlmClient) -> (Router, TempDir) {
    create_test_app_with_settings(mock, ConverterSettings::default())
}

pub fn create_test_app_with_settings(
    mock: MockLlmClient,
    settings: ConverterSettings,
) -> (Router, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let favicon_path = temp_dir.path().join("favicon.ico");
    std::fs::write(&favicon_path, FAVICON_BYTES).unwrap();

    let converter = Converter::new(Arc::new(mock), settings);
    let app = build_router(AppState::new(converter, favicon_path));

    (app, temp_dir)
}

pub fn json_request(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
