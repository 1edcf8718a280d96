use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dronewatch_core::{INGEST_PATH, STREAM_PATH};
use prometheus::{Encoder, TextEncoder};
use tokio::sync::broadcast::error::RecvError;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{validate_frame, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(STREAM_PATH, get(ws_stream))
        .route(INGEST_PATH, post(ingest))
        .route("/healthz", get(healthz))
        .route("/version", get(version))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str { "ok" }

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&state.metrics.registry.gather(), &mut buf) {
        warn!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    ([(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())], buf).into_response()
}

// Body is decoded by the same rules the viewer applies to frames.
async fn ingest(State(state): State<AppState>, body: String) -> Response {
    match validate_frame(&body) {
        Ok((sample, frame)) => {
            let receivers = state.publish_frame(frame);
            debug!(x = sample.x, y = sample.y, z = sample.z, receivers, "telemetry ingested");
            Json(serde_json::json!({"status": "ok"})).into_response()
        }
        Err(e) => {
            warn!(error = %e, "rejected telemetry payload");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

async fn ws_stream(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_ws_loop(state, socket))
}

async fn stream_ws_loop(state: AppState, mut socket: WebSocket) {
    use tokio::select;

    let client = Uuid::new_v4();
    let mut rx = state.subscribe();
    state.metrics.ws_clients.inc();
    info!(%client, clients = state.metrics.ws_clients.get(), "telemetry client connected");

    loop {
        select! {
            // Clients are receive-only; anything they send is ignored.
            ws_msg = socket.recv() => {
                match ws_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%client, error = %e, "telemetry client read failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            frame = rx.recv() => {
                match frame {
                    Ok(text) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%client, skipped, "slow telemetry client skipped frames");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    let _ = socket.close().await;
    state.metrics.ws_clients.dec();
    info!(%client, clients = state.metrics.ws_clients.get(), "telemetry client disconnected");
}
