//! UseCase: ライブチャットメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendChatMessageUseCase::execute() メソッド
//! - 検証 → レート制限 → ブロードキャスト → 永続化の一連の流れ
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：空文字・長すぎるメッセージの拒否
//! - レート制限の契約（60 秒あたり 10 件）の保証
//! - 永続化にはクライアント提供の ID ではなく認証済みユーザー ID が
//!   使われることの確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：部屋全体へのブロードキャストと永続化
//! - 異常系：検証エラー、レート制限超過、永続化失敗

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::common::time::Clock;
use crate::domain::{
    ChatRateLimiter, ChatText, ConnectionContext, LiveRoomRegistry, LiveSessionStore,
    MessagePusher, SessionId, Timestamp,
};
use crate::infrastructure::dto::websocket::{LiveChatBroadcastMessage, MessageType};

use super::error::ChatError;

/// チャットメッセージ送信のユースケース
pub struct SendChatMessageUseCase {
    /// 部屋レジストリ（ブロードキャスト対象の解決）
    registry: Arc<LiveRoomRegistry>,
    /// 永続化ストア（ベストエフォート）
    store: Arc<dyn LiveSessionStore>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// レートリミッター（このユースケースが排他的に所有する）
    limiter: Mutex<ChatRateLimiter>,
    /// サーバー時刻の供給源
    clock: Arc<dyn Clock>,
}

impl SendChatMessageUseCase {
    /// 新しい SendChatMessageUseCase を作成
    pub fn new(
        registry: Arc<LiveRoomRegistry>,
        store: Arc<dyn LiveSessionStore>,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            pusher,
            limiter: Mutex::new(ChatRateLimiter::new()),
            clock,
        }
    }

    /// チャットメッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `ctx` - 送信者の認証済み接続コンテキスト
    /// * `session_id` - 宛先のライブセッション
    /// * `raw_message` - クライアントから受信した生のメッセージ
    ///
    /// # Returns
    ///
    /// * `Ok(Timestamp)` - 送信成功（サーバーが割り当てたタイムスタンプ）
    /// * `Err(ChatError)` - 検証エラーまたはレート制限超過（送信者のみに通知）
    pub async fn execute(
        &self,
        ctx: &ConnectionContext,
        session_id: &SessionId,
        raw_message: &str,
    ) -> Result<Timestamp, ChatError> {
        // 1. 検証（トリム、空文字、500 文字制限）
        let text = ChatText::new(raw_message)?;

        // 2. レート制限（ユーザー ID 単位の固定ウィンドウ）
        let now = self.clock.now_utc_millis();
        {
            let mut limiter = self.limiter.lock().await;
            if !limiter.try_acquire(&ctx.user_id, now) {
                tracing::debug!(
                    "Rate limit exceeded for user '{}' in session '{}'",
                    ctx.user_id,
                    session_id
                );
                return Err(ChatError::RateLimitExceeded);
            }
        }

        // 3. 部屋全体にブロードキャスト（送信者を含む）
        let timestamp = Timestamp::new(now);
        let targets = self.registry.viewers_of(session_id).await;
        let msg = LiveChatBroadcastMessage {
            r#type: MessageType::LiveChatMessage,
            username: ctx.username.clone(),
            message: text.as_str().to_string(),
            timestamp: timestamp.value(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        if let Err(e) = self.pusher.broadcast(targets, &json).await {
            tracing::warn!(
                "Failed to broadcast chat message for session '{}': {}",
                session_id,
                e
            );
        }

        // 4. 認証済みユーザー ID に対して永続化（ベストエフォート）
        if let Err(e) = self
            .store
            .persist_chat_message(session_id, &ctx.user_id, &text, timestamp)
            .await
        {
            tracing::warn!(
                "Failed to persist chat message for session '{}': {}",
                session_id,
                e
            );
        }

        Ok(timestamp)
    }
}
