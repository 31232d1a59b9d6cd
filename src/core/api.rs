//! HTTP + WebSocket API for applock
//!
//! Endpoints:
//! - GET  /health                 - Health check
//! - GET  /status                 - Run flag and locked apps
//! - POST /monitor/start          - Start monitoring a list of apps
//! - POST /monitor/stop           - Stop monitoring
//! - GET|POST /permissions/overlay      - Query / request overlay permission
//! - GET|POST /permissions/usage-stats  - Query / request usage access
//! - POST /overlay/show, /overlay/hide  - Manual overlay control
//! - WS   /ws                     - Overlay event plane

use axum::{
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::control::{AppLocker, MonitorStatus};
use crate::types::{MonitorError, OverlayMessage};

/// Start monitoring request
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub app_list: Vec<String>,
}

/// Acknowledgement response
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Permission response
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub granted: bool,
}

/// Manual overlay response
#[derive(Debug, Serialize)]
pub struct OverlayResponse {
    pub ok: bool,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub monitoring: bool,
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match self {
            MonitorError::PermissionDenied => StatusCode::FORBIDDEN,
            MonitorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the API router
pub fn create_router(locker: Arc<AppLocker>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/monitor/start", post(start_monitoring))
        .route("/monitor/stop", post(stop_monitoring))
        .route(
            "/permissions/overlay",
            get(check_overlay_permission).post(ask_overlay_permission),
        )
        .route(
            "/permissions/usage-stats",
            get(check_usage_stats_permission).post(ask_usage_stats_permission),
        )
        .route("/overlay/show", post(show_overlay))
        .route("/overlay/hide", post(hide_overlay))
        .route("/ws", get(websocket_handler))
        .with_state(locker)
}

/// Health check endpoint
async fn health(State(locker): State<Arc<AppLocker>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        monitoring: locker.is_monitoring().await,
    })
}

async fn status(State(locker): State<Arc<AppLocker>>) -> Json<MonitorStatus> {
    Json(locker.status().await)
}

/// Start monitoring
async fn start_monitoring(
    State(locker): State<Arc<AppLocker>>,
    Json(req): Json<StartRequest>,
) -> Result<Json<AckResponse>, MonitorError> {
    let message = locker.start_monitoring(req.app_list).await?;
    Ok(Json(AckResponse {
        message: message.to_string(),
    }))
}

/// Stop monitoring
async fn stop_monitoring(
    State(locker): State<Arc<AppLocker>>,
) -> Result<Json<AckResponse>, MonitorError> {
    let message = locker.stop_monitoring().await?;
    Ok(Json(AckResponse {
        message: message.to_string(),
    }))
}

async fn check_overlay_permission(State(locker): State<Arc<AppLocker>>) -> Json<PermissionResponse> {
    Json(PermissionResponse {
        granted: locker.check_overlay_permission(),
    })
}

async fn ask_overlay_permission(State(locker): State<Arc<AppLocker>>) -> Json<PermissionResponse> {
    Json(PermissionResponse {
        granted: locker.ask_overlay_permission(),
    })
}

async fn check_usage_stats_permission(
    State(locker): State<Arc<AppLocker>>,
) -> Json<PermissionResponse> {
    Json(PermissionResponse {
        granted: locker.check_usage_stats_permission(),
    })
}

async fn ask_usage_stats_permission(
    State(locker): State<Arc<AppLocker>>,
) -> Json<PermissionResponse> {
    Json(PermissionResponse {
        granted: locker.ask_usage_stats_permission(),
    })
}

async fn show_overlay(State(locker): State<Arc<AppLocker>>) -> Json<OverlayResponse> {
    Json(OverlayResponse {
        ok: locker.show_overlay(),
    })
}

async fn hide_overlay(State(locker): State<Arc<AppLocker>>) -> Json<OverlayResponse> {
    Json(OverlayResponse {
        ok: locker.hide_overlay(),
    })
}

/// WebSocket handler for the overlay event plane
async fn websocket_handler(
    State(locker): State<Arc<AppLocker>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = locker.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward overlay messages until the client goes away
async fn handle_websocket(socket: WebSocket, rx: broadcast::Receiver<OverlayMessage>) {
    let (sender, receiver) = socket.split();
    forward_overlay_messages(sender, receiver, rx).await;
    debug!("UI listener disconnected");
}

/// Event-plane pump: every overlay message becomes one JSON text frame.
/// Ends on client close, a failed send, or when the sink is gone.
async fn forward_overlay_messages<S, R>(
    mut sender: S,
    mut receiver: R,
    mut rx: broadcast::Receiver<OverlayMessage>,
) where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            message = rx.recv() => {
                match message {
                    Ok(message) => {
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(error = %e, "could not encode overlay message");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "UI listener lagged, overlay messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Run the API server
pub async fn run_server(addr: &str, locker: Arc<AppLocker>) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(locker);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "applock API listening");
    println!("🔒 applock API running on {}", addr);
    println!("  GET  /health                    - Health check");
    println!("  GET  /status                    - Run flag and locked apps");
    println!("  POST /monitor/start             - Start monitoring");
    println!("  POST /monitor/stop              - Stop monitoring");
    println!("  GET|POST /permissions/overlay     - Overlay permission");
    println!("  GET|POST /permissions/usage-stats - Usage access");
    println!("  POST /overlay/show|hide         - Manual overlay");
    println!("  WS   /ws                        - Overlay events");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn text_frames(sent: &[Message]) -> Vec<String> {
        sent.iter()
            .filter_map(|m| match m {
                Message::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_forwards_until_sink_closes() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(OverlayMessage::show("com.game.app")).unwrap();
        tx.send(OverlayMessage::HideOverlay).unwrap();
        drop(tx);

        let mut sent: Vec<Message> = Vec::new();
        forward_overlay_messages(&mut sent, stream::pending(), rx).await;

        assert_eq!(
            text_frames(&sent),
            vec![
                r#"{"method":"showOverlay","arguments":{"packageName":"com.game.app"}}"#.to_string(),
                r#"{"method":"hideOverlay"}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_client_close_ends_forwarding() {
        let (tx, rx) = broadcast::channel::<OverlayMessage>(16);
        let client = stream::iter(vec![Ok(Message::Ping(vec![1])), Ok(Message::Close(None))]);

        let mut sent: Vec<Message> = Vec::new();
        forward_overlay_messages(&mut sent, client, rx).await;

        assert!(sent.is_empty());
        assert_eq!(tx.receiver_count(), 0);
    }
}
