//! メッセージ送信（通知）の trait 定義
//!
//! 接続中のクライアントへのメッセージ送信インターフェースを定義します。
//! 具体的な実装（WebSocket の `UnboundedSender` 管理）は Infrastructure 層が
//! 提供します（依存性の逆転）。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::ConnectionId;

/// クライアントへのメッセージ送信用チャンネル
///
/// 受信側ごとに FIFO が保証されるため、同一の送信元→宛先経路上の
/// シグナリングメッセージは送信順に配送される。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// メッセージ送信エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagePushError {
    /// チャンネルへの送信に失敗した
    #[error("failed to push message: {0}")]
    PushFailed(String),

    /// 宛先の接続が存在しない
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),
}

/// MessagePusher trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には
/// 依存しない。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録する（ハンドシェイク成功時に一度だけ呼ばれる）
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続を登録解除する（切断時に呼ばれる）
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// 特定の接続にメッセージを送信する
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にメッセージをブロードキャストする
    ///
    /// 一部の宛先が存在しない場合も残りへの送信は続行される（部分失敗を許容）。
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 接続中の全クライアントにメッセージをブロードキャストする
    ///
    /// セッションのライフサイクル告知（live-started / live-ended）に使用。
    async fn broadcast_all(&self, content: &str) -> Result<(), MessagePushError>;
}
