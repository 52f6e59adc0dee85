//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::domain::{AuthGateway, LiveRoomRegistry, MessagePusher};
use crate::usecase::{
    DisconnectConnectionUseCase, JoinLiveUseCase, SendChatMessageUseCase, SignalingRelayUseCase,
};

use super::{
    handler::{
        http::{announce_live_ended, announce_live_started, get_session_viewers, health_check},
        websocket::websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Live-session signaling relay server
///
/// This struct encapsulates the server configuration and provides methods to
/// run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(auth, pusher, registry, join_live, chat, signaling, disconnect);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// AuthGateway（ハンドシェイク認証の抽象化）
    auth: Arc<dyn AuthGateway>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// 部屋レジストリ
    registry: Arc<LiveRoomRegistry>,
    /// JoinLiveUseCase（参加・退出のユースケース）
    join_live: Arc<JoinLiveUseCase>,
    /// SendChatMessageUseCase（チャット送信のユースケース）
    chat: Arc<SendChatMessageUseCase>,
    /// SignalingRelayUseCase（シグナリング中継のユースケース）
    signaling: Arc<SignalingRelayUseCase>,
    /// DisconnectConnectionUseCase（切断クリーンアップのユースケース）
    disconnect: Arc<DisconnectConnectionUseCase>,
}

impl Server {
    /// Create a new Server instance
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        pusher: Arc<dyn MessagePusher>,
        registry: Arc<LiveRoomRegistry>,
        join_live: Arc<JoinLiveUseCase>,
        chat: Arc<SendChatMessageUseCase>,
        signaling: Arc<SignalingRelayUseCase>,
        disconnect: Arc<DisconnectConnectionUseCase>,
    ) -> Self {
        Self {
            auth,
            pusher,
            registry,
            join_live,
            chat,
            signaling,
            disconnect,
        }
    }

    /// Run the signaling relay server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address
    /// or if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app_state = Arc::new(AppState {
            auth: self.auth,
            pusher: self.pusher,
            registry: self.registry,
            join_live: self.join_live,
            chat: self.chat,
            signaling: self.signaling,
            disconnect: self.disconnect,
        });

        // Define handlers
        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/live/{session_id}/viewers", get(get_session_viewers))
            // CRUD バックエンドから呼ばれる内部エンドポイント
            .route("/internal/announce/live-started", post(announce_live_started))
            .route("/internal/announce/live-ended", post(announce_live_ended))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state);

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        // Start the server
        tracing::info!(
            "Live-session signaling relay listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
