//! HTTP API DTOs for the internal endpoints of the signaling relay.

use serde::{Deserialize, Serialize};

/// Live viewer state of one session (inspection endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionViewersDto {
    pub session_id: String,
    pub viewers_count: usize,
    pub broadcaster_connected: bool,
}

/// Request body for the live-ended announcement endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEndedRequest {
    pub session_id: String,
}
