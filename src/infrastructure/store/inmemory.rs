//! InMemory LiveSessionStore 実装
//!
//! ドメイン層が定義する LiveSessionStore trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! 本番では CRUD バックエンドがセッションの耐久データを所有するため、
//! この実装はテストとスタンドアロン実行のための代替です。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatText, LiveSessionStore, SessionId, StoreError, Timestamp, UserId};

/// 永続化されたチャットメッセージのレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChatMessage {
    pub user_id: UserId,
    pub message: ChatText,
    pub timestamp: Timestamp,
}

/// セッションごとの耐久データ
#[derive(Debug, Clone, Default)]
struct SessionRecord {
    viewer_count: usize,
    messages: Vec<StoredChatMessage>,
}

/// インメモリ LiveSessionStore 実装
pub struct InMemoryLiveSessionStore {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl InMemoryLiveSessionStore {
    /// 新しい InMemoryLiveSessionStore を作成
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// セッションの永続化済み視聴者数を取得（テスト・検査用）
    pub async fn viewer_count_of(&self, session_id: &SessionId) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.get(session_id).map_or(0, |r| r.viewer_count)
    }

    /// セッションの永続化済みチャット履歴を取得（テスト・検査用）
    pub async fn messages_of(&self, session_id: &SessionId) -> Vec<StoredChatMessage> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .map(|r| r.messages.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryLiveSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiveSessionStore for InMemoryLiveSessionStore {
    async fn persist_viewer_count(
        &self,
        session_id: &SessionId,
        count: usize,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().await;
        sessions.entry(session_id.clone()).or_default().viewer_count = count;
        Ok(())
    }

    async fn persist_chat_message(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        message: &ChatText,
        timestamp: Timestamp,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.clone())
            .or_default()
            .messages
            .push(StoredChatMessage {
                user_id: user_id.clone(),
                message: message.clone(),
                timestamp,
            });
        Ok(())
    }
}
