//! CRUD バックエンドの内部 API を呼ぶ LiveSessionStore 実装
//!
//! リレーはサイドカーとしてデプロイされ、セッションの耐久データ
//! （視聴者数、チャット履歴）はメインの CRUD サービスが所有します。
//! この実装はその内部 API への HTTP 書き込みを行います。
//!
//! - `PUT  {base}/internal/live/{session_id}/viewers`
//! - `POST {base}/internal/live/{session_id}/chat`
//!
//! 書き込みはベストエフォートであり、呼び出し側（UseCase 層）が失敗を
//! ログに残して続行します。

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{ChatText, LiveSessionStore, SessionId, StoreError, Timestamp, UserId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewerCountBody {
    viewers_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessageBody<'a> {
    user_id: &'a str,
    message: &'a str,
    timestamp: i64,
}

/// HTTP バックエンド LiveSessionStore 実装
pub struct HttpBackendStore {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBackendStore {
    /// 新しい HttpBackendStore を作成
    ///
    /// # Arguments
    ///
    /// * `base_url` - CRUD バックエンドのベース URL（例: `http://localhost:5000`）
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LiveSessionStore for HttpBackendStore {
    async fn persist_viewer_count(
        &self,
        session_id: &SessionId,
        count: usize,
    ) -> Result<(), StoreError> {
        let url = format!(
            "{}/internal/live/{}/viewers",
            self.base_url,
            session_id.as_str()
        );
        let response = self
            .http
            .put(&url)
            .json(&ViewerCountBody {
                viewers_count: count,
            })
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::SessionNotFound(session_id.as_str().to_string()));
        }
        response
            .error_for_status()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn persist_chat_message(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        message: &ChatText,
        timestamp: Timestamp,
    ) -> Result<(), StoreError> {
        let url = format!(
            "{}/internal/live/{}/chat",
            self.base_url,
            session_id.as_str()
        );
        let response = self
            .http
            .post(&url)
            .json(&ChatMessageBody {
                user_id: user_id.as_str(),
                message: message.as_str(),
                timestamp: timestamp.value(),
            })
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::SessionNotFound(session_id.as_str().to_string()));
        }
        response
            .error_for_status()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
