//! 認証ゲートウェイの実装
//!
//! ## 概要
//!
//! このモジュールは `AuthGateway` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `jwt`: HS256 アクセストークンの検証 + バックエンドのユーザー解決

pub mod jwt;

pub use jwt::JwtAuthGateway;
