//! WebSocket event DTOs for the live-session signaling relay.
//!
//! Field names follow the browser client's wire format (camelCase payload
//! fields, kebab-case event types). WebRTC payloads (`offer`, `answer`,
//! `candidate`) are opaque to the relay and kept as raw JSON values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message type enum for server-sent events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    ViewersCount,
    LiveChatMessage,
    BroadcasterReady,
    BroadcasterStopped,
    ViewerJoined,
    WebrtcOffer,
    WebrtcAnswer,
    WebrtcIceCandidate,
    LiveStarted,
    LiveEnded,
    Error,
}

/// Inbound events (client -> server)
///
/// Parsed from the JSON text frame by the `type` discriminator. A frame that
/// does not match any variant is a validation failure reported back to the
/// sender only.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinLive {
        session_id: String,
    },
    LeaveLive {
        session_id: String,
    },
    LiveChatMessage {
        session_id: String,
        message: String,
    },
    BroadcasterReady {
        session_id: String,
    },
    BroadcasterStopped {
        session_id: String,
    },
    RequestStream {
        session_id: String,
    },
    WebrtcOffer {
        session_id: String,
        offer: Value,
        target_id: String,
    },
    WebrtcAnswer {
        session_id: String,
        answer: Value,
        target_id: String,
    },
    WebrtcIceCandidate {
        session_id: String,
        candidate: Value,
        #[serde(default)]
        target_id: Option<String>,
    },
}

/// Viewer count update broadcast to a session's room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewersCountMessage {
    pub r#type: MessageType,
    pub viewers_count: usize,
}

/// Chat message broadcast to a session's room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatBroadcastMessage {
    pub r#type: MessageType,
    pub username: String,
    pub message: String,
    /// Server-assigned Unix timestamp (milliseconds)
    pub timestamp: i64,
}

/// Notification that a broadcaster is ready to negotiate streams
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcasterReadyMessage {
    pub r#type: MessageType,
}

/// Notification that the broadcaster stopped streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcasterStoppedMessage {
    pub r#type: MessageType,
}

/// Delivered to the broadcaster when a viewer requests a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerJoinedMessage {
    pub r#type: MessageType,
    pub viewer_id: String,
}

/// WebRTC offer relayed verbatim to the target connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebrtcOfferMessage {
    pub r#type: MessageType,
    pub offer: Value,
    pub sender_id: String,
}

/// WebRTC answer relayed verbatim to the target connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebrtcAnswerMessage {
    pub r#type: MessageType,
    pub answer: Value,
    pub sender_id: String,
}

/// ICE candidate relayed to the target connection (or the whole room)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebrtcIceCandidateMessage {
    pub r#type: MessageType,
    pub candidate: Value,
    pub sender_id: String,
}

/// Session lifecycle announcement: a live session started
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStartedMessage {
    pub r#type: MessageType,
    /// Session payload from the CRUD service, passed through verbatim
    pub session: Value,
}

/// Session lifecycle announcement: a live session ended
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEndedMessage {
    pub r#type: MessageType,
    pub session_id: String,
}

/// Scoped error reported to the sender only
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub message: String,
}
