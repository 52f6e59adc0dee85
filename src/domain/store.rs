//! 永続化コラボレーターの trait 定義
//!
//! ライブセッションの耐久データ（視聴者数、チャット履歴）は周辺の CRUD
//! サービスが所有します。この trait はリレーが必要とする書き込み
//! インターフェースのみを定義し、具体的な実装は Infrastructure 層が
//! 提供します（依存性の逆転）。
//!
//! ## 耐久性の位置づけ
//!
//! 永続化はベストエフォートです。書き込み失敗は記録されますが、
//! インメモリの部屋状態とブロードキャストが優先されます（呼び出し側が
//! 失敗をログに残して続行する契約）。

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::{ChatText, SessionId, Timestamp, UserId};

/// 永続化エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// ストアへの書き込みに失敗した（接続不可、HTTP エラーなど）
    #[error("live session store unavailable: {0}")]
    Unavailable(String),

    /// 対象のセッションが存在しない
    #[error("live session '{0}' not found")]
    SessionNotFound(String),
}

/// ライブセッションストア trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装
/// （インメモリ、HTTP バックエンド）には依存しない。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LiveSessionStore: Send + Sync {
    /// セッションの視聴者数を永続化する
    async fn persist_viewer_count(
        &self,
        session_id: &SessionId,
        count: usize,
    ) -> Result<(), StoreError>;

    /// チャットメッセージを永続化する
    ///
    /// `user_id` は必ず認証済みの接続コンテキストから取る（クライアント
    /// 提供の ID は信用しない）。
    async fn persist_chat_message(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        message: &ChatText,
        timestamp: Timestamp,
    ) -> Result<(), StoreError>;
}
