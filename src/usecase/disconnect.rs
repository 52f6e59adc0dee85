//! UseCase: 接続切断時のクリーンアップ処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectConnectionUseCase::execute() メソッド
//! - 切断した接続に由来する全状態の一括クリーンアップと通知
//!
//! ### なぜこのテストが必要か
//! - クリーンアップの漏れは幽霊視聴者（実体のない視聴者数）や、二度と
//!   解除されないブロードキャスターリンクを生む
//! - ブロードキャスターの突然の切断でも視聴者に broadcaster-stopped が
//!   届くことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：視聴者の切断と視聴者数の再ブロードキャスト
//! - エッジケース：ブロードキャスターの明示的 stop なしの切断
//! - どのセッションにも属さない接続の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, LiveRoomRegistry, MessagePusher, SessionCleanup};

use super::{JoinLiveUseCase, SignalingRelayUseCase};

/// 接続切断クリーンアップのユースケース
///
/// トランスポートが閉じたとき（明示的な切断・突然の切断の両方）に一度だけ
/// 呼ばれ、レジストリ・プッシャー・シグナリングの状態を接続の破棄と
/// まとめて purge する。
pub struct DisconnectConnectionUseCase {
    /// 部屋レジストリ
    registry: Arc<LiveRoomRegistry>,
    /// MessagePusher（チャンネル登録の解除）
    pusher: Arc<dyn MessagePusher>,
    /// 視聴者数の再ブロードキャストに使用
    join_live: Arc<JoinLiveUseCase>,
    /// broadcaster-stopped の通知に使用
    signaling: Arc<SignalingRelayUseCase>,
}

impl DisconnectConnectionUseCase {
    /// 新しい DisconnectConnectionUseCase を作成
    pub fn new(
        registry: Arc<LiveRoomRegistry>,
        pusher: Arc<dyn MessagePusher>,
        join_live: Arc<JoinLiveUseCase>,
        signaling: Arc<SignalingRelayUseCase>,
    ) -> Self {
        Self {
            registry,
            pusher,
            join_live,
            signaling,
        }
    }

    /// 接続切断のクリーンアップを実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 切断した接続の ID
    ///
    /// # Returns
    ///
    /// 影響を受けたセッションごとのクリーンアップ結果
    pub async fn execute(&self, connection_id: &ConnectionId) -> Vec<SessionCleanup> {
        // 先にチャンネル登録を解除し、死んだ接続への送信を打ち切る
        self.pusher.unregister_connection(connection_id).await;

        let cleanups = self.registry.disconnect(connection_id).await;
        tracing::info!(
            "Connection '{}' disconnected ({} sessions affected)",
            connection_id,
            cleanups.len()
        );

        for cleanup in &cleanups {
            if cleanup.removed_viewer {
                self.join_live
                    .publish_viewer_count(&cleanup.session_id, cleanup.viewer_count)
                    .await;
            }
            if cleanup.released_broadcaster {
                tracing::info!(
                    "Broadcaster '{}' disconnected from session '{}' without explicit stop",
                    connection_id,
                    cleanup.session_id
                );
                self.signaling
                    .notify_broadcaster_stopped(&cleanup.session_id, connection_id)
                    .await;
            }
        }

        cleanups
    }
}
