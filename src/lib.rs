//! Live-session signaling relay library for Tradecast.
//!
//! This library provides the real-time coordination layer of the Tradecast
//! live-streaming feature: viewer presence tracking, broadcaster election,
//! session chat with per-user rate limiting, and WebRTC negotiation-message
//! routing over WebSocket.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// shared library
pub mod common;
