//! UseCase: WebRTC シグナリングの中継処理
//!
//! ## 責務
//!
//! - ブロードキャスター登録・解除イベントの処理と部屋への通知
//! - 視聴者の配信要求（request-stream）の重複抑止付きの中継
//! - オファー・アンサー・ICE 候補の接続 ID ベースのルーティング
//!
//! ## 設計ノート
//!
//! この層は純粋なルーティングであり、ネゴシエーションのペイロード
//! （offer / answer / candidate）の中身を検査・変更しません。宛先の
//! 接続が存在しない場合（RoutingMiss）は送信者にエラーを返さず、
//! ログに残して破棄します。宛先は正当な理由で切断している可能性が
//! あるためです。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - broadcaster_ready / broadcaster_stopped の状態遷移と通知
//! - request_stream の重複抑止（NotifiedViewerSet）
//! - offer / answer / ICE 候補のルーティング先の正しさ
//!
//! ### なぜこのテストが必要か
//! - 重複した viewer-joined は二重のピア接続ネゴシエーションを引き起こす
//! - 誤配送は別の視聴者のネゴシエーションを破壊する
//!
//! ### どのような状況を想定しているか
//! - 正常系：ready → request-stream → offer/answer の往復
//! - エッジケース：ブロードキャスター不在時の要求、部屋に先に視聴者が
//!   いる状態での ready、非ブロードキャスターからの stopped

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{ConnectionId, LiveRoomRegistry, MessagePusher, SessionId};
use crate::infrastructure::dto::websocket::{
    BroadcasterReadyMessage, BroadcasterStoppedMessage, MessageType, ViewerJoinedMessage,
    WebrtcAnswerMessage, WebrtcIceCandidateMessage, WebrtcOfferMessage,
};

/// シグナリング中継のユースケース
pub struct SignalingRelayUseCase {
    /// 部屋レジストリ（ブロードキャスターリンクと通知済み集合の所有者）
    registry: Arc<LiveRoomRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
}

impl SignalingRelayUseCase {
    /// 新しい SignalingRelayUseCase を作成
    pub fn new(registry: Arc<LiveRoomRegistry>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { registry, pusher }
    }

    /// broadcaster-ready イベントの処理
    ///
    /// 送信者をセッションのブロードキャスターとして記録し（stale リンクは
    /// 上書き）、部屋にいる全視聴者へ broadcaster-ready を通知する。さらに
    /// 部屋に既にいる各接続について、ブロードキャスターへ合成の
    /// viewer-joined を直接送る。視聴者の join が ready より先行している
    /// 場合があるためで、合成通知も通知済みとして記録する（以降の
    /// request-stream を重複として抑止する）。
    pub async fn broadcaster_ready(&self, session_id: &SessionId, connection_id: &ConnectionId) {
        if let Some(stale) = self
            .registry
            .register_broadcaster(session_id, connection_id)
            .await
        {
            tracing::info!(
                "Replaced stale broadcaster '{}' with '{}' for session '{}'",
                stale,
                connection_id,
                session_id
            );
        }
        tracing::info!(
            "Broadcaster '{}' ready for session '{}'",
            connection_id,
            session_id
        );

        let viewers = self.registry.viewers_of(session_id).await;
        let targets: Vec<ConnectionId> = viewers
            .into_iter()
            .filter(|viewer| viewer != connection_id)
            .collect();

        let ready_msg = BroadcasterReadyMessage {
            r#type: MessageType::BroadcasterReady,
        };
        let ready_json = serde_json::to_string(&ready_msg).unwrap();
        if let Err(e) = self.pusher.broadcast(targets.clone(), &ready_json).await {
            tracing::warn!(
                "Failed to notify room of broadcaster-ready for session '{}': {}",
                session_id,
                e
            );
        }

        // 既に部屋にいる視聴者のぶんの合成 viewer-joined
        for viewer in targets {
            if self.registry.mark_notified(session_id, &viewer).await {
                self.deliver_viewer_joined(session_id, connection_id, &viewer)
                    .await;
            }
        }
    }

    /// broadcaster-stopped イベントの処理
    ///
    /// 現在のブロードキャスターからの要求のみを受け付け、リンクを解除して
    /// 部屋に通知する。通知済み集合はリンク解除と同時にクリアされる
    /// （clear-on-stop ポリシー）。
    pub async fn broadcaster_stopped(&self, session_id: &SessionId, connection_id: &ConnectionId) {
        if !self
            .registry
            .release_broadcaster(session_id, connection_id)
            .await
        {
            tracing::warn!(
                "Ignoring broadcaster-stopped from '{}': not the broadcaster of session '{}'",
                connection_id,
                session_id
            );
            return;
        }
        tracing::info!(
            "Broadcaster '{}' stopped for session '{}'",
            connection_id,
            session_id
        );
        self.notify_broadcaster_stopped(session_id, connection_id)
            .await;
    }

    /// ブロードキャスターの切断時の通知
    ///
    /// 明示的な stop イベントなしで接続が閉じた場合に、部屋へ
    /// broadcaster-stopped を届ける（リンク解除自体は切断クリーンアップが
    /// 済ませている）。
    pub async fn notify_broadcaster_stopped(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) {
        let targets: Vec<ConnectionId> = self
            .registry
            .viewers_of(session_id)
            .await
            .into_iter()
            .filter(|viewer| viewer != connection_id)
            .collect();
        let msg = BroadcasterStoppedMessage {
            r#type: MessageType::BroadcasterStopped,
        };
        let json = serde_json::to_string(&msg).unwrap();
        if let Err(e) = self.pusher.broadcast(targets, &json).await {
            tracing::warn!(
                "Failed to notify room of broadcaster-stopped for session '{}': {}",
                session_id,
                e
            );
        }
    }

    /// request-stream イベントの処理
    ///
    /// ブロードキャスターが未登録なら黙って破棄する（クライアント側が
    /// リトライする前提）。既に通知済みの視聴者からの要求も破棄する。
    /// それ以外は通知済みとして記録し、ブロードキャスターへ viewer-joined
    /// を届ける。
    pub async fn request_stream(&self, session_id: &SessionId, connection_id: &ConnectionId) {
        let Some(broadcaster) = self.registry.broadcaster_of(session_id).await else {
            tracing::debug!(
                "No broadcaster for session '{}', dropping request-stream from '{}'",
                session_id,
                connection_id
            );
            return;
        };

        if !self.registry.mark_notified(session_id, connection_id).await {
            tracing::debug!(
                "Viewer '{}' already notified for session '{}', dropping duplicate request-stream",
                connection_id,
                session_id
            );
            return;
        }

        self.deliver_viewer_joined(session_id, &broadcaster, connection_id)
            .await;
    }

    /// webrtc-offer の中継（ブロードキャスター → 視聴者）
    pub async fn relay_offer(
        &self,
        session_id: &SessionId,
        sender_id: &ConnectionId,
        target_id: &ConnectionId,
        offer: Value,
    ) {
        let msg = WebrtcOfferMessage {
            r#type: MessageType::WebrtcOffer,
            offer,
            sender_id: sender_id.as_str().to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        if let Err(e) = self.pusher.push_to(target_id, &json).await {
            tracing::warn!(
                "Dropping webrtc-offer for session '{}': target '{}' unreachable: {}",
                session_id,
                target_id,
                e
            );
        }
    }

    /// webrtc-answer の中継（視聴者 → ブロードキャスター）
    pub async fn relay_answer(
        &self,
        session_id: &SessionId,
        sender_id: &ConnectionId,
        target_id: &ConnectionId,
        answer: Value,
    ) {
        let msg = WebrtcAnswerMessage {
            r#type: MessageType::WebrtcAnswer,
            answer,
            sender_id: sender_id.as_str().to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        if let Err(e) = self.pusher.push_to(target_id, &json).await {
            tracing::warn!(
                "Dropping webrtc-answer for session '{}': target '{}' unreachable: {}",
                session_id,
                target_id,
                e
            );
        }
    }

    /// webrtc-ice-candidate の中継
    ///
    /// 宛先が指定されていればその接続だけに、指定がなければ送信者を除く
    /// 部屋の全接続に届ける（ピア未解決の実装向けのフォールバック）。
    pub async fn relay_ice_candidate(
        &self,
        session_id: &SessionId,
        sender_id: &ConnectionId,
        target_id: Option<&ConnectionId>,
        candidate: Value,
    ) {
        let msg = WebrtcIceCandidateMessage {
            r#type: MessageType::WebrtcIceCandidate,
            candidate,
            sender_id: sender_id.as_str().to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();

        match target_id {
            Some(target) => {
                if let Err(e) = self.pusher.push_to(target, &json).await {
                    tracing::warn!(
                        "Dropping webrtc-ice-candidate for session '{}': target '{}' unreachable: {}",
                        session_id,
                        target,
                        e
                    );
                }
            }
            None => {
                let targets: Vec<ConnectionId> = self
                    .registry
                    .viewers_of(session_id)
                    .await
                    .into_iter()
                    .filter(|viewer| viewer != sender_id)
                    .collect();
                if let Err(e) = self.pusher.broadcast(targets, &json).await {
                    tracing::warn!(
                        "Failed to broadcast webrtc-ice-candidate for session '{}': {}",
                        session_id,
                        e
                    );
                }
            }
        }
    }

    /// viewer-joined をブロードキャスターへ届ける
    async fn deliver_viewer_joined(
        &self,
        session_id: &SessionId,
        broadcaster: &ConnectionId,
        viewer: &ConnectionId,
    ) {
        let msg = ViewerJoinedMessage {
            r#type: MessageType::ViewerJoined,
            viewer_id: viewer.as_str().to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        if let Err(e) = self.pusher.push_to(broadcaster, &json).await {
            tracing::warn!(
                "Dropping viewer-joined for session '{}': broadcaster '{}' unreachable: {}",
                session_id,
                broadcaster,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessagePushError, PusherChannel};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    // 個別送信とブロードキャストの両方を記録する MessagePusher のテストダブル
    #[derive(Default)]
    struct RecordingPusher {
        pushes: Mutex<Vec<(ConnectionId, String)>>,
        broadcasts: Mutex<Vec<(Vec<ConnectionId>, String)>>,
    }

    #[async_trait]
    impl MessagePusher for RecordingPusher {
        async fn register_connection(&self, _connection_id: ConnectionId, _sender: PusherChannel) {}

        async fn unregister_connection(&self, _connection_id: &ConnectionId) {}

        async fn push_to(
            &self,
            connection_id: &ConnectionId,
            content: &str,
        ) -> Result<(), MessagePushError> {
            self.pushes
                .lock()
                .await
                .push((connection_id.clone(), content.to_string()));
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

    fn setup() -> (Arc<LiveRoomRegistry>, Arc<RecordingPusher>, SignalingRelayUseCase) {
        let registry = Arc::new(LiveRoomRegistry::new());
        let pusher = Arc::new(RecordingPusher::default());
        let usecase = SignalingRelayUseCase::new(registry.clone(), pusher.clone());
        (registry, pusher, usecase)
    }

    #[tokio::test]
    async fn test_broadcaster_ready_notifies_room_and_emits_synthetic_viewer_joined() {
        // テスト項目: 部屋に視聴者が先にいる状態の ready で、視聴者には
        // broadcaster-ready、ブロードキャスターには合成 viewer-joined が届く
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v1 = conn("v1");
        registry.join(&s, &v1).await;

        // when (操作):
        usecase.broadcaster_ready(&s, &b).await;

        // then (期待する結果):
        let broadcasts = pusher.broadcasts.lock().await;
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].0, vec![v1.clone()]);
        assert!(broadcasts[0].1.contains(r#""type":"broadcaster-ready""#));

        let pushes = pusher.pushes.lock().await;
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, b);
        assert!(pushes[0].1.contains(r#""viewerId":"v1""#));
    }

    #[tokio::test]
    async fn test_synthetic_viewer_joined_suppresses_later_request_stream() {
        // テスト項目: 合成 viewer-joined を受けた視聴者の request-stream は重複として破棄される
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v1 = conn("v1");
        registry.join(&s, &v1).await;
        usecase.broadcaster_ready(&s, &b).await;
        assert_eq!(pusher.pushes.lock().await.len(), 1);

        // when (操作):
        usecase.request_stream(&s, &v1).await;

        // then (期待する結果): 2 通目の viewer-joined は送られない
        assert_eq!(pusher.pushes.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_request_stream_without_broadcaster_is_dropped() {
        // テスト項目: ブロードキャスター不在の request-stream は黙って破棄される
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let v1 = conn("v1");
        registry.join(&s, &v1).await;

        // when (操作):
        usecase.request_stream(&s, &v1).await;

        // then (期待する結果):
        assert!(pusher.pushes.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_stream_retry_after_broadcaster_arrives_succeeds() {
        // テスト項目: 破棄された要求もブロードキャスター登場後のリトライで成功する
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v1 = conn("v1");
        registry.join(&s, &v1).await;
        usecase.request_stream(&s, &v1).await;
        assert!(pusher.pushes.lock().await.is_empty());
        registry.register_broadcaster(&s, &b).await;

        // when (操作):
        usecase.request_stream(&s, &v1).await;

        // then (期待する結果):
        let pushes = pusher.pushes.lock().await;
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, b);
    }

    #[tokio::test]
    async fn test_first_request_stream_delivers_exactly_one_viewer_joined() {
        // テスト項目: ブロードキャスター登録済みなら最初の request-stream だけが
        // viewer-joined を発生させる
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v2 = conn("v2");
        usecase.broadcaster_ready(&s, &b).await;
        registry.join(&s, &v2).await;

        // when (操作):
        usecase.request_stream(&s, &v2).await;
        usecase.request_stream(&s, &v2).await;
        usecase.request_stream(&s, &v2).await;

        // then (期待する結果):
        let pushes = pusher.pushes.lock().await;
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, b);
        assert!(pushes[0].1.contains(r#""viewerId":"v2""#));
    }

    #[tokio::test]
    async fn test_broadcaster_stopped_notifies_room_and_resets_dedup() {
        // テスト項目: stop でリンクが解除され、新しい配信で同じ視聴者が再び通知される
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v1 = conn("v1");
        registry.join(&s, &v1).await;
        usecase.broadcaster_ready(&s, &b).await;

        // when (操作):
        usecase.broadcaster_stopped(&s, &b).await;

        // then (期待する結果): 部屋へ broadcaster-stopped が届く
        let broadcasts = pusher.broadcasts.lock().await;
        assert!(broadcasts
            .last()
            .unwrap()
            .1
            .contains(r#""type":"broadcaster-stopped""#));
        drop(broadcasts);
        assert_eq!(registry.broadcaster_of(&s).await, None);

        // 新しい配信エポックでは合成 viewer-joined が再び届く
        usecase.broadcaster_ready(&s, &b).await;
        assert_eq!(pusher.pushes.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_broadcaster_stopped_from_non_broadcaster_is_ignored() {
        // テスト項目: ブロードキャスター以外からの stopped は無視される
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let imposter = conn("imposter");
        registry.join(&s, &conn("v1")).await;
        usecase.broadcaster_ready(&s, &b).await;
        let broadcasts_before = pusher.broadcasts.lock().await.len();

        // when (操作):
        usecase.broadcaster_stopped(&s, &imposter).await;

        // then (期待する結果): リンクは維持され、通知も出ない
        assert_eq!(registry.broadcaster_of(&s).await, Some(b));
        assert_eq!(pusher.broadcasts.lock().await.len(), broadcasts_before);
    }

    #[tokio::test]
    async fn test_offer_is_delivered_only_to_target_with_sender_id() {
        // テスト項目: offer は targetId の接続だけに senderId 付きで届く
        // given (前提条件):
        let (_registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v1 = conn("v1");

        // when (操作):
        usecase
            .relay_offer(&s, &b, &v1, serde_json::json!({"sdp": "v=0"}))
            .await;

        // then (期待する結果):
        let pushes = pusher.pushes.lock().await;
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, v1);
        assert!(pushes[0].1.contains(r#""senderId":"b""#));
        assert!(pushes[0].1.contains(r#""sdp":"v=0""#));
        assert!(pusher.broadcasts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_answer_is_delivered_to_target() {
        // テスト項目: answer は targetId（ブロードキャスター）に届く
        // given (前提条件):
        let (_registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v1 = conn("v1");

        // when (操作):
        usecase
            .relay_answer(&s, &v1, &b, serde_json::json!({"sdp": "answer"}))
            .await;

        // then (期待する結果):
        let pushes = pusher.pushes.lock().await;
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, b);
        assert!(pushes[0].1.contains(r#""senderId":"v1""#));
    }

    #[tokio::test]
    async fn test_ice_candidate_with_target_goes_to_target_only() {
        // テスト項目: targetId 付きの ICE 候補はその接続だけに届く
        // given (前提条件):
        let (_registry, pusher, usecase) = setup();
        let s = session("s1");

        // when (操作):
        usecase
            .relay_ice_candidate(
                &s,
                &conn("v1"),
                Some(&conn("b")),
                serde_json::json!({"candidate": "host"}),
            )
            .await;

        // then (期待する結果):
        assert_eq!(pusher.pushes.lock().await.len(), 1);
        assert!(pusher.broadcasts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_ice_candidate_without_target_fans_out_to_room_except_sender() {
        // テスト項目: targetId なしの ICE 候補は送信者を除く部屋全体に届く
        // given (前提条件):
        let (registry, pusher, usecase) = setup();
        let s = session("s1");
        let b = conn("b");
        let v1 = conn("v1");
        registry.join(&s, &b).await;
        registry.join(&s, &v1).await;

        // when (操作):
        usecase
            .relay_ice_candidate(&s, &b, None, serde_json::json!({"candidate": "srflx"}))
            .await;

        // then (期待する結果):
        let broadcasts = pusher.broadcasts.lock().await;
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].0, vec![v1]);
    }
}
