//! WebSocket connection handlers: the connection gateway and event dispatcher.
//!
//! Every connection is authenticated here before any other handler can see
//! it: the handshake carries a bearer access token in the `token` query
//! parameter, and the upgrade is refused with 401 when the token is missing,
//! invalid, or resolves to a user that no longer exists. The authenticated
//! context (`ConnectionContext`) is populated exactly once per connection
//! lifetime and never re-resolved.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{AuthError, ConnectionContext, ConnectionId, ConnectionIdFactory, SessionId},
    infrastructure::dto::websocket::{ClientEvent, ErrorMessage, MessageType},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Bearer access token (the handshake's auxiliary auth field)
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Authenticate before the upgrade: no event handler is reachable for an
    // unauthenticated connection.
    let Some(token) = query.token else {
        tracing::warn!(
            "Rejecting WebSocket handshake: {}",
            AuthError::MissingCredential
        );
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(user_id) = state.auth.validate_credential(&token).await else {
        tracing::warn!(
            "Rejecting WebSocket handshake: {}",
            AuthError::InvalidCredential
        );
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(profile) = state.auth.resolve_user(&user_id).await else {
        tracing::warn!(
            "Rejecting WebSocket handshake: {}",
            AuthError::UnknownUser(user_id.as_str().to_string())
        );
        return Err(StatusCode::UNAUTHORIZED);
    };

    let ctx = ConnectionContext {
        connection_id: ConnectionIdFactory::generate(),
        user_id,
        username: profile.username,
        is_admin: profile.is_admin,
    };

    // Create a channel for this connection to receive messages
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .pusher
        .register_connection(ctx.connection_id.clone(), tx)
        .await;

    tracing::info!(
        "Connection '{}' authenticated as user '{}' ('{}')",
        ctx.connection_id,
        ctx.user_id,
        ctx.username
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, ctx, rx)))
}

/// Spawns a task that receives messages from the rx channel and pushes them
/// to the WebSocket sender.
///
/// This function handles the outbound message flow: events addressed to this
/// connection (via its rx channel) are written to its WebSocket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    ctx: ConnectionContext,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    // Spawn a task to push outbound messages to this connection
    let mut send_task = pusher_loop(rx, sender);

    let ctx_clone = ctx.clone();
    let state_clone = state.clone();

    // Spawn a task to receive events from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let event = match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!(
                                "Malformed event from connection '{}': {}",
                                ctx_clone.connection_id,
                                e
                            );
                            send_error(
                                &state_clone,
                                &ctx_clone,
                                "unrecognized or malformed event",
                            )
                            .await;
                            continue;
                        }
                    };
                    dispatch_event(&state_clone, &ctx_clone, event).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!(
                        "Connection '{}' requested close",
                        ctx_clone.connection_id
                    );
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Purge registry, notified-set, broadcaster and pusher state with the
    // connection, and notify affected rooms.
    state.disconnect.execute(&ctx.connection_id).await;
}

/// Dispatch one parsed client event to the owning use case.
async fn dispatch_event(state: &Arc<AppState>, ctx: &ConnectionContext, event: ClientEvent) {
    match event {
        ClientEvent::JoinLive { session_id } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            state.join_live.join(&session_id, &ctx.connection_id).await;
        }
        ClientEvent::LeaveLive { session_id } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            state.join_live.leave(&session_id, &ctx.connection_id).await;
        }
        ClientEvent::LiveChatMessage {
            session_id,
            message,
        } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            if let Err(e) = state.chat.execute(ctx, &session_id, &message).await {
                send_error(state, ctx, &e.to_string()).await;
            }
        }
        ClientEvent::BroadcasterReady { session_id } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            if !ctx.is_admin {
                tracing::warn!(
                    "Rejecting broadcaster-ready from non-admin user '{}'",
                    ctx.user_id
                );
                send_error(state, ctx, "only admins can broadcast").await;
                return;
            }
            state
                .signaling
                .broadcaster_ready(&session_id, &ctx.connection_id)
                .await;
        }
        ClientEvent::BroadcasterStopped { session_id } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            state
                .signaling
                .broadcaster_stopped(&session_id, &ctx.connection_id)
                .await;
        }
        ClientEvent::RequestStream { session_id } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            state
                .signaling
                .request_stream(&session_id, &ctx.connection_id)
                .await;
        }
        ClientEvent::WebrtcOffer {
            session_id,
            offer,
            target_id,
        } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            let Some(target_id) = require_target_id(state, ctx, target_id).await else {
                return;
            };
            state
                .signaling
                .relay_offer(&session_id, &ctx.connection_id, &target_id, offer)
                .await;
        }
        ClientEvent::WebrtcAnswer {
            session_id,
            answer,
            target_id,
        } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            let Some(target_id) = require_target_id(state, ctx, target_id).await else {
                return;
            };
            state
                .signaling
                .relay_answer(&session_id, &ctx.connection_id, &target_id, answer)
                .await;
        }
        ClientEvent::WebrtcIceCandidate {
            session_id,
            candidate,
            target_id,
        } => {
            let Some(session_id) = require_session_id(state, ctx, session_id).await else {
                return;
            };
            let target_id = match target_id {
                Some(raw) => {
                    let Some(target_id) = require_target_id(state, ctx, raw).await else {
                        return;
                    };
                    Some(target_id)
                }
                None => None,
            };
            state
                .signaling
                .relay_ice_candidate(
                    &session_id,
                    &ctx.connection_id,
                    target_id.as_ref(),
                    candidate,
                )
                .await;
        }
    }
}

/// Parse a raw session id, reporting a scoped error to the sender on failure.
async fn require_session_id(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    raw: String,
) -> Option<SessionId> {
    match SessionId::new(raw) {
        Ok(session_id) => Some(session_id),
        Err(e) => {
            send_error(state, ctx, &e.to_string()).await;
            None
        }
    }
}

/// Parse a raw target connection id, reporting a scoped error to the sender
/// on failure.
async fn require_target_id(
    state: &Arc<AppState>,
    ctx: &ConnectionContext,
    raw: String,
) -> Option<ConnectionId> {
    match ConnectionId::new(raw) {
        Ok(target_id) => Some(target_id),
        Err(e) => {
            send_error(state, ctx, &e.to_string()).await;
            None
        }
    }
}

/// Report a recoverable failure to the sender only; the connection stays open.
async fn send_error(state: &Arc<AppState>, ctx: &ConnectionContext, message: &str) {
    let msg = ErrorMessage {
        r#type: MessageType::Error,
        message: message.to_string(),
    };
    let json = serde_json::to_string(&msg).unwrap();
    if let Err(e) = state.pusher.push_to(&ctx.connection_id, &json).await {
        tracing::warn!(
            "Failed to deliver error event to connection '{}': {}",
            ctx.connection_id,
            e
        );
    }
}
