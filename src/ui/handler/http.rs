//! HTTP endpoint handlers.
//!
//! The `/internal` endpoints are called by the CRUD backend (which owns the
//! live-session lifecycle) to reach connected WebSocket clients; they are
//! expected to be network-isolated from the public internet by deployment.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;

use crate::{
    domain::SessionId,
    infrastructure::dto::{
        http::{LiveEndedRequest, SessionViewersDto},
        websocket::{LiveEndedMessage, LiveStartedMessage, MessageType},
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get the live viewer state of one session (inspection endpoint)
pub async fn get_session_viewers(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionViewersDto>, StatusCode> {
    let session_id = SessionId::new(session_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let viewers_count = state.registry.viewer_count(&session_id).await;
    let broadcaster_connected = state.registry.broadcaster_of(&session_id).await.is_some();

    Ok(Json(SessionViewersDto {
        session_id: session_id.into_string(),
        viewers_count,
        broadcaster_connected,
    }))
}

/// Announce a newly started live session to every connected client.
///
/// The request body is the session payload from the CRUD service and is
/// passed through to clients verbatim.
pub async fn announce_live_started(
    State(state): State<Arc<AppState>>,
    Json(session): Json<Value>,
) -> StatusCode {
    let msg = LiveStartedMessage {
        r#type: MessageType::LiveStarted,
        session,
    };
    let json = serde_json::to_string(&msg).unwrap();
    if let Err(e) = state.pusher.broadcast_all(&json).await {
        tracing::warn!("Failed to announce live-started: {}", e);
    }
    StatusCode::NO_CONTENT
}

/// Announce an ended live session to every connected client.
pub async fn announce_live_ended(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LiveEndedRequest>,
) -> StatusCode {
    let msg = LiveEndedMessage {
        r#type: MessageType::LiveEnded,
        session_id: request.session_id,
    };
    let json = serde_json::to_string(&msg).unwrap();
    if let Err(e) = state.pusher.broadcast_all(&json).await {
        tracing::warn!("Failed to announce live-ended: {}", e);
    }
    StatusCode::NO_CONTENT
}
