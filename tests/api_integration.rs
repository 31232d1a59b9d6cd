//! Integration tests for the HTTP API
//!
//! Tests control-plane endpoints against a simulated platform

use std::sync::Arc;

use applock::config::MonitorConfig;
use applock::core::{create_router, AppLocker, MemoryStore, MemoryUsageLog, SimulatedPlatform};
use applock::types::OverlayMessage;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

fn create_test_locker(overlay_granted: bool) -> Arc<AppLocker> {
    Arc::new(AppLocker::new(
        MonitorConfig {
            poll_period_ms: 20,
            ..MonitorConfig::default()
        },
        Arc::new(MemoryStore::new()),
        Arc::new(SimulatedPlatform::new(overlay_granted, false)),
        Arc::new(MemoryUsageLog::new()),
    ))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(create_test_locker(true));

    let (status, json) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["monitoring"], false);
}

#[tokio::test]
async fn test_start_and_stop_flow() {
    let app = create_router(create_test_locker(true));

    let (status, json) = call(
        &app,
        post("/monitor/start", r#"{"app_list": ["com.game.app", "com.video.app"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Service started successfully");

    let (status, json) = call(&app, get("/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["monitoring"], true);
    assert_eq!(json["stopped"], false);
    assert_eq!(
        json["locked_apps"],
        serde_json::json!(["com.game.app", "com.video.app"])
    );

    let (status, json) = call(&app, post("/monitor/stop", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Service stopped successfully");

    let (_, json) = call(&app, get("/status")).await;
    assert_eq!(json["monitoring"], false);
    assert_eq!(json["stopped"], true);
}

#[tokio::test]
async fn test_start_without_permission_is_forbidden() {
    let app = create_router(create_test_locker(false));

    let (status, json) = call(&app, post("/monitor/start", r#"{"app_list": ["com.game.app"]}"#)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "PERMISSION_DENIED");
    assert_eq!(json["message"], "Overlay permission is not granted");

    let (_, json) = call(&app, get("/status")).await;
    assert_eq!(json["monitoring"], false);
    assert_eq!(json["stopped"], true);
    assert_eq!(json["locked_apps"], serde_json::json!([]));
}

#[tokio::test]
async fn test_start_with_missing_list_locks_nothing() {
    let app = create_router(create_test_locker(true));

    let (status, _) = call(&app, post("/monitor/start", "{}")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = call(&app, get("/status")).await;
    assert_eq!(json["monitoring"], true);
    assert_eq!(json["locked_apps"], serde_json::json!([]));
}

#[tokio::test]
async fn test_permission_endpoints() {
    let app = create_router(create_test_locker(true));

    let (status, json) = call(&app, get("/permissions/overlay")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["granted"], true);

    let (_, json) = call(&app, get("/permissions/usage-stats")).await;
    assert_eq!(json["granted"], false);

    // Opening the settings screen reports success; the grant itself is async
    let (status, json) = call(&app, post("/permissions/usage-stats", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["granted"], true);
}

#[tokio::test]
async fn test_manual_overlay_endpoints() {
    let locker = create_test_locker(true);
    let mut rx = locker.subscribe();
    let app = create_router(locker);

    let (status, json) = call(&app, post("/overlay/show", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(
        rx.recv().await.unwrap(),
        OverlayMessage::ShowOverlay(None)
    );

    let (_, json) = call(&app, post("/overlay/hide", "")).await;
    assert_eq!(json["ok"], true);
    assert_eq!(rx.recv().await.unwrap(), OverlayMessage::HideOverlay);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_router(create_test_locker(true));

    let (status, _) = call(&app, get("/nonexistent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
