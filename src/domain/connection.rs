//! Connection identity and per-connection context.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{UserId, error::ValueObjectError};

/// Transport-level connection identifier value object.
///
/// Assigned by the gateway when a WebSocket upgrade succeeds; opaque to every
/// other component. Signaling targets (`targetId` fields) arrive from clients
/// as raw strings and are wrapped back into this type for routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a ConnectionId from a raw string (e.g., a client-supplied targetId).
    ///
    /// # Returns
    ///
    /// A Result containing the ConnectionId or an error if the string is empty
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ConnectionIdEmpty);
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Factory for generating ConnectionId instances.
///
/// This factory encapsulates the generation of fresh connection identifiers,
/// separating the generation concern from the validation logic in ConnectionId.
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    /// Generate a new ConnectionId with a random UUID v4.
    pub fn generate() -> ConnectionId {
        ConnectionId(uuid::Uuid::new_v4().to_string())
    }
}

/// Authenticated per-connection context.
///
/// Populated exactly once by the gateway during the handshake and carried for
/// the lifetime of the connection. `username` and `is_admin` are cached here
/// so event handlers never re-resolve the user mid-connection.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Transport-level connection identifier
    pub connection_id: ConnectionId,
    /// Authenticated user identifier (from the validated credential)
    pub user_id: UserId,
    /// Username cached at connect time
    pub username: String,
    /// Admin flag cached at connect time
    pub is_admin: bool,
}
