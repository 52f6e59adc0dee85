//! チャットのユーザー別レート制限
//!
//! ## 責務
//!
//! - ユーザー ID ごとの固定ウィンドウカウンター（ChatRateState）の管理
//! - ウィンドウ満了時のリセットと次ウィンドウへの延長
//!
//! ## 設計ノート
//!
//! 状態は Chat Relay（SendChatMessageUseCase）が排他的に所有します。
//! 現在時刻は呼び出し側が `Clock` から取得して渡すため、ウィンドウの
//! 満了はテストで決定的に再現できます。
//!
//! キーは接続 ID ではなくユーザー ID です。同一ユーザーが再接続しても
//! 進行中のウィンドウは引き継がれます。

use std::collections::HashMap;

use super::UserId;

/// レートウィンドウの長さ（ミリ秒）
pub const CHAT_RATE_WINDOW_MILLIS: i64 = 60_000;

/// 1 ウィンドウあたりの受理メッセージ数の上限
pub const CHAT_RATE_MAX_MESSAGES: u32 = 10;

/// ユーザーごとのウィンドウ状態
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    /// 現在のウィンドウ内で受理したメッセージ数
    count: u32,
    /// ウィンドウがリセットされる時刻（Unix ミリ秒）
    window_reset_at: i64,
}

/// チャットレートリミッター
pub struct ChatRateLimiter {
    window_millis: i64,
    max_messages: u32,
    states: HashMap<UserId, RateWindow>,
}

impl ChatRateLimiter {
    /// 既定の制限（60 秒あたり 10 件）でリミッターを作成
    pub fn new() -> Self {
        Self::with_limits(CHAT_RATE_WINDOW_MILLIS, CHAT_RATE_MAX_MESSAGES)
    }

    /// 任意の制限でリミッターを作成（テスト用途）
    pub fn with_limits(window_millis: i64, max_messages: u32) -> Self {
        Self {
            window_millis,
            max_messages,
            states: HashMap::new(),
        }
    }

    /// メッセージ 1 件の受理を試みる
    ///
    /// ウィンドウが満了していればカウントを 0 に戻し、ウィンドウを現在
    /// 時刻から延長する。カウントが上限に達している場合は受理せず
    /// `false` を返す（カウントはそれ以上増えない）。受理した場合は
    /// カウントを進めて `true` を返す。
    pub fn try_acquire(&mut self, user_id: &UserId, now_millis: i64) -> bool {
        let state = self
            .states
            .entry(user_id.clone())
            .or_insert(RateWindow {
                count: 0,
                window_reset_at: now_millis + self.window_millis,
            });

        if now_millis > state.window_reset_at {
            state.count = 0;
            state.window_reset_at = now_millis + self.window_millis;
        }

        if state.count >= self.max_messages {
            return false;
        }

        state.count += 1;
        true
    }
}

impl Default for ChatRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
