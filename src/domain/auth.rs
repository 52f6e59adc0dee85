//! 認証ゲートウェイの trait 定義
//!
//! 接続ハンドシェイク時の認証に必要なインターフェースを定義します。
//! 具体的な実装（JWT 検証、ユーザー解決）は Infrastructure 層が提供します
//! （依存性の逆転）。

use async_trait::async_trait;
use thiserror::Error;

use super::UserId;

/// 接続時にキャッシュされるユーザープロフィール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// 表示名（チャットのブロードキャストに使用）
    pub username: String,
    /// 管理者フラグ（ブロードキャスター権限の判定に使用）
    pub is_admin: bool,
}

/// 認証エラー
///
/// いずれも接続に対して致命的であり、ハンドシェイクを拒否して接続を閉じる。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 資格情報がハンドシェイクに含まれていない
    #[error("access token required")]
    MissingCredential,

    /// 資格情報が無効または期限切れ
    #[error("invalid or expired token")]
    InvalidCredential,

    /// 資格情報は有効だが、ユーザーが存在しない
    #[error("user '{0}' no longer exists")]
    UnknownUser(String),
}

/// 認証ゲートウェイ trait
///
/// Gateway（UI 層）はこの trait に依存し、Infrastructure 層の具体的な
/// 実装（JWT + バックエンドのユーザー参照）には依存しない。
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Bearer 資格情報を検証し、ユーザー ID に解決する
    ///
    /// 無効・期限切れの場合は `None` を返す。
    async fn validate_credential(&self, token: &str) -> Option<UserId>;

    /// ユーザー ID からプロフィール（username, is_admin）を解決する
    ///
    /// ユーザーが存在しない場合は `None` を返す。
    async fn resolve_user(&self, user_id: &UserId) -> Option<UserProfile>;
}
