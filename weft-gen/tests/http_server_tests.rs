//! HTTP server tests
//!
//! Exercises the axum router end-to-end with `tower::ServiceExt::oneshot`
//! and a scripted provider factory; no network, no model API.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use helpers::{ScriptedFactory, ScriptedProvider};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use weft_common::config::TomlConfig;
use weft_gen::{build_router, AppState};

fn scripted_app(provider: std::sync::Arc<ScriptedProvider>) -> axum::Router {
    let state = AppState::with_provider_factory(
        TomlConfig::default(),
        ScriptedFactory::new(provider),
    );
    build_router(state)
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_service() {
    let app = scripted_app(ScriptedProvider::new(vec![]));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "weft-gen");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn validate_endpoint_aggregates_issues() {
    let app = scripted_app(ScriptedProvider::new(vec![]));
    let response = app
        .oneshot(json_request(
            "/api/validate",
            json!({"code": "$: s(\"bd\").room(0.99)"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["valid"], false);
    let issues = body["issues"].as_array().unwrap();
    assert!(issues.iter().any(|i| i.as_str().unwrap().contains("setcpm")));
    assert!(issues
        .iter()
        .any(|i| i.as_str().unwrap().contains("Room size 0.99")));
}

#[tokio::test]
async fn validate_endpoint_honors_overrides() {
    let app = scripted_app(ScriptedProvider::new(vec![]));
    let response = app
        .oneshot(json_request(
            "/api/validate",
            json!({
                "code": "setcpm(120/4)\n$: s(\"bd\").room(0.99)",
                "options": {"maxRoomSize": 1.0}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["issues"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn validate_endpoint_rejects_empty_code() {
    let app = scripted_app(ScriptedProvider::new(vec![]));
    let response = app
        .oneshot(json_request("/api/validate", json!({"code": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn generate_endpoint_streams_sse_frames() {
    let provider = ScriptedProvider::new(vec![Ok(vec![
        "```javascript\nsetcpm(120/4)\n",
        "$: note(\"c3 e3\").s(\"piano\")\n```",
    ])]);
    let app = scripted_app(provider);

    let response = app
        .oneshot(json_request(
            "/api/generate",
            json!({
                "prompt": "a calm piano pattern",
                "mode": "new",
                "model": "claude-3-5-sonnet-20241022",
                "apiKey": "test-key"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let body = body_string(response).await;
    assert!(body.contains("event: content_block_delta"));
    assert!(body.contains(r#""type":"content_block_delta""#));
    assert!(body.contains(r#""type":"status""#));
    // Every stream closes with the done sentinel.
    assert!(body.contains(r#""type":"done""#));
}

#[tokio::test]
async fn generate_failure_emits_error_frame_then_done() {
    // Prose-only response: terminal extraction failure.
    let provider = ScriptedProvider::new(vec![Ok(vec!["I cannot help with that."])]);
    let app = scripted_app(provider);

    let response = app
        .oneshot(json_request(
            "/api/generate",
            json!({
                "prompt": "a beat",
                "model": "claude-3-5-sonnet-20241022",
                "apiKey": "test-key"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(r#""type":"error""#));
    assert!(body.contains("no code block found"));
    let error_pos = body.find(r#""type":"error""#).unwrap();
    let done_pos = body.find(r#""type":"done""#).unwrap();
    assert!(error_pos < done_pos, "error frame must precede the sentinel");
}

#[tokio::test]
async fn generate_retry_protocol_over_http() {
    let provider = ScriptedProvider::new(vec![
        Ok(vec!["```javascript\nsetcpm(120/4)\n$: s(\"bd\").room(0.99)\n```"]),
        Ok(vec!["```javascript\nsetcpm(120/4)\n$: s(\"bd\").room(0.4)\n```"]),
    ]);
    let app = scripted_app(provider);

    let response = app
        .oneshot(json_request(
            "/api/generate",
            json!({
                "prompt": "a dub groove",
                "model": "claude-3-5-sonnet-20241022",
                "apiKey": "test-key"
            }),
        ))
        .await
        .unwrap();

    let body = body_string(response).await;
    let status_pos = body.find("validation failed").unwrap();
    let clear_pos = body.find(r#""type":"clear""#).unwrap();
    let done_pos = body.find(r#""type":"done""#).unwrap();
    assert!(status_pos < clear_pos);
    assert!(clear_pos < done_pos);
}
