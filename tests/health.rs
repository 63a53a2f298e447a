mod common;

use axum::http::StatusCode;
use shopease_api::routes::health::health_check;

use common::TestApp;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
}

#[tokio::test]
async fn unknown_path_is_a_json_404() {
    let app = TestApp::new();
    let (status, body) = app.request("GET", "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nope");
}
