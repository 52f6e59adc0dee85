//! UI layer: the HTTP/WebSocket surface of the signaling relay.

pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::Server;
