//! JWT を使った AuthGateway 実装
//!
//! ## 責務
//!
//! - ハンドシェイクで提示された HS256 アクセストークンの検証
//!   （CRUD バックエンドと共有する秘密鍵でローカルに検証）
//! - トークンから解決したユーザー ID のプロフィール照会
//!   （`GET {base}/internal/users/{user_id}`）
//!
//! トークンのペイロードはバックエンドの発行形式（`userId` クレーム、
//! 15 分の有効期限）に従います。

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::domain::{AuthGateway, UserId, UserProfile};

/// アクセストークンのクレーム
#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    #[serde(rename = "userId")]
    user_id: String,
    #[allow(dead_code)]
    exp: usize,
}

/// バックエンドのユーザー照会レスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserProfileBody {
    username: String,
    is_admin: bool,
}

/// JWT + バックエンド照会による AuthGateway 実装
pub struct JwtAuthGateway {
    decoding_key: DecodingKey,
    validation: Validation,
    backend_base_url: String,
    http: reqwest::Client,
}

impl JwtAuthGateway {
    /// 新しい JwtAuthGateway を作成
    ///
    /// # Arguments
    ///
    /// * `secret` - バックエンドと共有する HS256 秘密鍵
    /// * `backend_base_url` - CRUD バックエンドのベース URL
    pub fn new(secret: &str, backend_base_url: String) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            backend_base_url: backend_base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AuthGateway for JwtAuthGateway {
    async fn validate_credential(&self, token: &str) -> Option<UserId> {
        let claims = match decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!("Rejected access token: {}", e);
                return None;
            }
        };
        UserId::new(claims.user_id).ok()
    }

    async fn resolve_user(&self, user_id: &UserId) -> Option<UserProfile> {
        let url = format!(
            "{}/internal/users/{}",
            self.backend_base_url,
            user_id.as_str()
        );
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to resolve user '{}': {}", user_id, e);
                return None;
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return None;
        }
        let body: UserProfileBody = match response.error_for_status() {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Malformed user profile for '{}': {}", user_id, e);
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!("Failed to resolve user '{}': {}", user_id, e);
                return None;
            }
        };

        Some(UserProfile {
            username: body.username,
            is_admin: body.is_admin,
        })
    }
}
