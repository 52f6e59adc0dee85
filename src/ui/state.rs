//! Server state shared across handlers.

use std::sync::Arc;

use crate::domain::{AuthGateway, LiveRoomRegistry, MessagePusher};
use crate::usecase::{
    DisconnectConnectionUseCase, JoinLiveUseCase, SendChatMessageUseCase, SignalingRelayUseCase,
};

/// Shared application state
pub struct AppState {
    /// AuthGateway（ハンドシェイク認証の抽象化）
    pub auth: Arc<dyn AuthGateway>,
    /// MessagePusher（メッセージ通知の抽象化）
    pub pusher: Arc<dyn MessagePusher>,
    /// 部屋レジストリ（検査エンドポイントから参照）
    pub registry: Arc<LiveRoomRegistry>,
    /// JoinLiveUseCase（参加・退出のユースケース）
    pub join_live: Arc<JoinLiveUseCase>,
    /// SendChatMessageUseCase（チャット送信のユースケース）
    pub chat: Arc<SendChatMessageUseCase>,
    /// SignalingRelayUseCase（シグナリング中継のユースケース）
    pub signaling: Arc<SignalingRelayUseCase>,
    /// DisconnectConnectionUseCase（切断クリーンアップのユースケース）
    pub disconnect: Arc<DisconnectConnectionUseCase>,
}
