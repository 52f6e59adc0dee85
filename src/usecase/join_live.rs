//! UseCase: ライブセッションへの参加・退出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinLiveUseCase::join() / leave() メソッド
//! - 部屋への参加・退出と視聴者数ブロードキャスト、ベストエフォート永続化
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：ブロードキャストされる視聴者数が常に接続
//!   集合の濃度と一致する
//! - 永続化失敗時にもブロードキャストが行われること（耐久性はベスト
//!   エフォート）を保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加・退出と視聴者数の通知
//! - 冪等性：同じ接続の二重参加
//! - 異常系：永続化ストアの書き込み失敗

use std::sync::Arc;

use crate::domain::{
    ConnectionId, LiveRoomRegistry, LiveSessionStore, MessagePusher, SessionId,
};
use crate::infrastructure::dto::websocket::{MessageType, ViewersCountMessage};

/// ライブセッション参加・退出のユースケース
pub struct JoinLiveUseCase {
    /// 部屋レジストリ（インメモリの真実の源）
    registry: Arc<LiveRoomRegistry>,
    /// 永続化ストア（ベストエフォート）
    store: Arc<dyn LiveSessionStore>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
}

impl JoinLiveUseCase {
    /// 新しい JoinLiveUseCase を作成
    pub fn new(
        registry: Arc<LiveRoomRegistry>,
        store: Arc<dyn LiveSessionStore>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            registry,
            store,
            pusher,
        }
    }

    /// セッションの部屋に参加し、参加後の視聴者数を返す
    ///
    /// 冪等。新しい視聴者数を部屋全体にブロードキャストし、永続化を
    /// ベストエフォートで行う。
    pub async fn join(&self, session_id: &SessionId, connection_id: &ConnectionId) -> usize {
        let count = self.registry.join(session_id, connection_id).await;
        tracing::info!(
            "Connection '{}' joined live session '{}' ({} viewers)",
            connection_id,
            session_id,
            count
        );
        self.publish_viewer_count(session_id, count).await;
        count
    }

    /// セッションの部屋から退出し、退出後の視聴者数を返す
    ///
    /// 冪等。join と同じ再計算・永続化・ブロードキャスト契約に従う。
    pub async fn leave(&self, session_id: &SessionId, connection_id: &ConnectionId) -> usize {
        let count = self.registry.leave(session_id, connection_id).await;
        tracing::info!(
            "Connection '{}' left live session '{}' ({} viewers)",
            connection_id,
            session_id,
            count
        );
        self.publish_viewer_count(session_id, count).await;
        count
    }

    /// 視聴者数を部屋にブロードキャストし、その後に永続化する
    ///
    /// ブロードキャストはロック下で取得したスナップショットに対して先に
    /// 行う。永続化の失敗は回復可能としてログに残すのみで、部屋状態と
    /// 通知には影響しない。
    pub(crate) async fn publish_viewer_count(&self, session_id: &SessionId, count: usize) {
        let targets = self.registry.viewers_of(session_id).await;
        let msg = ViewersCountMessage {
            r#type: MessageType::ViewersCount,
            viewers_count: count,
        };
        let json = serde_json::to_string(&msg).unwrap();
        if let Err(e) = self.pusher.broadcast(targets, &json).await {
            tracing::warn!(
                "Failed to broadcast viewers-count for session '{}': {}",
                session_id,
                e
            );
        }

        if let Err(e) = self.store.persist_viewer_count(session_id, count).await {
            tracing::warn!(
                "Failed to persist viewer count for session '{}': {}",
                session_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::MockLiveSessionStore;
    use crate::domain::{MessagePushError, PusherChannel, StoreError};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    // 送信内容を記録する MessagePusher のテストダブル
    #[derive(Default)]
    struct RecordingPusher {
        broadcasts: Mutex<Vec<(Vec<ConnectionId>, String)>>,
    }

    #[async_trait]
    impl MessagePusher for RecordingPusher {
        async fn register_connection(&self, _connection_id: ConnectionId, _sender: PusherChannel) {}

        async fn unregister_connection(&self, _connection_id: &ConnectionId) {}

        async fn push_to(
            &self,
            _connection_id: &ConnectionId,
            _content: &str,
        ) -> Result<(), MessagePushError> {
            Ok(())
        }

        async fn broadcast(
            &self,
            targets: Vec<ConnectionId>,
            content: &str,
        ) -> Result<(), MessagePushError> {
            self.broadcasts
                .lock()
                .await
                .push((targets, content.to_string()));
            Ok(())
        }

        async fn broadcast_all(&self, _content: &str) -> Result<(), MessagePushError> {
            Ok(())
        }
    }

    fn session(id: &str) -> SessionId {
        SessionId::new(id.to_string()).unwrap()
    }

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_join_broadcasts_count_to_whole_room() {
        // テスト項目: join 後の視聴者数が部屋の全接続にブロードキャストされる
        // given (前提条件):
        let registry = Arc::new(LiveRoomRegistry::new());
        let mut store = MockLiveSessionStore::new();
        store
            .expect_persist_viewer_count()
            .returning(|_, _| Ok(()));
        let pusher = Arc::new(RecordingPusher::default());
        let usecase = JoinLiveUseCase::new(registry, Arc::new(store), pusher.clone());
        let s = session("s1");

        // when (操作):
        usecase.join(&s, &conn("c1")).await;
        let count = usecase.join(&s, &conn("c2")).await;

        // then (期待する結果):
        assert_eq!(count, 2);
        let broadcasts = pusher.broadcasts.lock().await;
        assert_eq!(broadcasts.len(), 2);
        // 2 回目のブロードキャストは両方の接続に届く
        assert_eq!(broadcasts[1].0.len(), 2);
        assert!(broadcasts[1].1.contains(r#""viewersCount":2"#));
    }

    #[tokio::test]
    async fn test_join_twice_yields_same_count_as_once() {
        // テスト項目: 同じ接続の二重 join は視聴者数を二重に数えない
        // given (前提条件):
        let registry = Arc::new(LiveRoomRegistry::new());
        let mut store = MockLiveSessionStore::new();
        store
            .expect_persist_viewer_count()
            .returning(|_, _| Ok(()));
        let usecase = JoinLiveUseCase::new(
            registry,
            Arc::new(store),
            Arc::new(RecordingPusher::default()),
        );
        let s = session("s1");
        let c = conn("c1");

        // when (操作):
        let first = usecase.join(&s, &c).await;
        let second = usecase.join(&s, &c).await;

        // then (期待する結果):
        assert_eq!(first, 1);
        assert_eq!(second, 1);
    }

    #[tokio::test]
    async fn test_leave_broadcasts_post_removal_count() {
        // テスト項目: leave 後は退出後の視聴者数がブロードキャストされる
        // given (前提条件):
        let registry = Arc::new(LiveRoomRegistry::new());
        let mut store = MockLiveSessionStore::new();
        store
            .expect_persist_viewer_count()
            .returning(|_, _| Ok(()));
        let pusher = Arc::new(RecordingPusher::default());
        let usecase = JoinLiveUseCase::new(registry, Arc::new(store), pusher.clone());
        let s = session("s1");
        let c1 = conn("c1");
        let c2 = conn("c2");
        usecase.join(&s, &c1).await;
        usecase.join(&s, &c2).await;

        // when (操作):
        let count = usecase.leave(&s, &c1).await;

        // then (期待する結果):
        assert_eq!(count, 1);
        let broadcasts = pusher.broadcasts.lock().await;
        let last = broadcasts.last().unwrap();
        assert_eq!(last.0, vec![c2]);
        assert!(last.1.contains(r#""viewersCount":1"#));
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_block_broadcast() {
        // テスト項目: 永続化が失敗してもブロードキャストは行われる
        // given (前提条件):
        let registry = Arc::new(LiveRoomRegistry::new());
        let mut store = MockLiveSessionStore::new();
        store.expect_persist_viewer_count().returning(|_, _| {
            Err(StoreError::Unavailable("backend down".to_string()))
        });
        let pusher = Arc::new(RecordingPusher::default());
        let usecase = JoinLiveUseCase::new(registry, Arc::new(store), pusher.clone());

        // when (操作):
        let count = usecase.join(&session("s1"), &conn("c1")).await;

        // then (期待する結果):
        assert_eq!(count, 1);
        assert_eq!(pusher.broadcasts.lock().await.len(), 1);
    }
}
