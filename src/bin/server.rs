//! Live-session signaling relay server for Tradecast.
//!
//! Tracks viewer presence, elects a single broadcaster per session, relays
//! session chat and WebRTC negotiation messages between connected clients.
//!
//! Run with:
//! ```not_rust
//! JWT_SECRET=... cargo run --bin server -- --backend-url http://localhost:5000
//! cargo run --bin server -- --host 0.0.0.0 --port 3000 --backend-url http://localhost:5000
//! ```

use std::sync::Arc;

use clap::Parser;
use tradecast_live::{
    common::{logger::setup_logger, time::SystemClock},
    domain::LiveRoomRegistry,
    infrastructure::{
        auth::JwtAuthGateway, message_pusher::WebSocketMessagePusher, store::HttpBackendStore,
    },
    ui::Server,
    usecase::{
        DisconnectConnectionUseCase, JoinLiveUseCase, SendChatMessageUseCase,
        SignalingRelayUseCase,
    },
};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Live-session signaling relay for Tradecast", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Base URL of the CRUD backend (user resolution and durable writes)
    #[arg(long)]
    backend_url: String,

    /// HS256 secret shared with the backend (falls back to the JWT_SECRET
    /// environment variable)
    #[arg(long)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let jwt_secret = match args
        .jwt_secret
        .or_else(|| std::env::var("JWT_SECRET").ok())
    {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            tracing::error!("JWT_SECRET is not set (pass --jwt-secret or the JWT_SECRET env var)");
            std::process::exit(1);
        }
    };

    // Initialize dependencies in order:
    // 1. Registry + MessagePusher
    // 2. Collaborator gateways (auth, store)
    // 3. UseCases
    // 4. Server

    // 1. Create the room registry and pusher (in-memory, per-process)
    let registry = Arc::new(LiveRoomRegistry::new());
    let pusher = Arc::new(WebSocketMessagePusher::new());

    // 2. Create collaborator gateways
    let auth = Arc::new(JwtAuthGateway::new(&jwt_secret, args.backend_url.clone()));
    let store = Arc::new(HttpBackendStore::new(args.backend_url));

    // 3. Create UseCases
    let join_live = Arc::new(JoinLiveUseCase::new(
        registry.clone(),
        store.clone(),
        pusher.clone(),
    ));
    let chat = Arc::new(SendChatMessageUseCase::new(
        registry.clone(),
        store.clone(),
        pusher.clone(),
        Arc::new(SystemClock),
    ));
    let signaling = Arc::new(SignalingRelayUseCase::new(registry.clone(), pusher.clone()));
    let disconnect = Arc::new(DisconnectConnectionUseCase::new(
        registry.clone(),
        pusher.clone(),
        join_live.clone(),
        signaling.clone(),
    ));

    // 4. Create and run the server
    let server = Server::new(
        auth,
        pusher,
        registry,
        join_live,
        chat,
        signaling,
        disconnect,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
