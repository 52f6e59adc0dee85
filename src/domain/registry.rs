//! ライブセッションの部屋状態を管理するレジストリ
//!
//! ## 責務
//!
//! - SessionViewerSet: セッションごとの視聴者（接続 ID）の集合
//! - NotifiedViewerSet: ブロードキャスターに通知済みの視聴者の集合
//!   （viewer-joined の重複抑止ガード）
//! - ブロードキャスターリンク: セッションごとの現在のブロードキャスター接続
//!
//! ## 設計ノート
//!
//! 3 つのマップは単一の Mutex の内側にまとめて保持します。状態の変更と
//! 宛先スナップショットの取得が同一ロック下で行われるため、プロセス内の
//! 競合はありません。プロセスをまたぐ水平スケールでは、この状態を外部の
//! 共有ストアに退避する必要があります（本リレーの対象外）。
//!
//! インスタンスはプロセス起動時に一度だけ構築され、`Arc` で共有されます。
//! プロセス再起動でゼロから再構築される（永続化されない）前提の状態です。

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use super::{ConnectionId, SessionId};

/// 切断時のクリーンアップ結果（影響を受けたセッションごとに 1 件）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCleanup {
    /// 影響を受けたセッション
    pub session_id: SessionId,
    /// 切断した接続が視聴者として部屋から取り除かれたか
    pub removed_viewer: bool,
    /// 取り除いた後の視聴者数
    pub viewer_count: usize,
    /// 切断した接続がこのセッションのブロードキャスターだったか
    pub released_broadcaster: bool,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// session_id -> 部屋に参加中の接続 ID の集合
    viewers: HashMap<SessionId, HashSet<ConnectionId>>,
    /// session_id -> viewer-joined 通知済みの接続 ID の集合
    notified: HashMap<SessionId, HashSet<ConnectionId>>,
    /// session_id -> 現在のブロードキャスター接続
    broadcasters: HashMap<SessionId, ConnectionId>,
}

/// ライブセッションの部屋レジストリ
pub struct LiveRoomRegistry {
    inner: Mutex<RegistryInner>,
}

impl LiveRoomRegistry {
    /// 新しい空のレジストリを作成
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// 接続をセッションの部屋に参加させ、参加後の視聴者数を返す
    ///
    /// 冪等: 同じ接続が二度参加しても視聴者数は変わらない。
    pub async fn join(&self, session_id: &SessionId, connection_id: &ConnectionId) -> usize {
        let mut inner = self.inner.lock().await;
        let room = inner.viewers.entry(session_id.clone()).or_default();
        room.insert(connection_id.clone());
        room.len()
    }

    /// 接続をセッションの部屋から退出させ、退出後の視聴者数を返す
    ///
    /// 冪等: 部屋にいない接続の退出は視聴者数を変えない。
    pub async fn leave(&self, session_id: &SessionId, connection_id: &ConnectionId) -> usize {
        let mut inner = self.inner.lock().await;
        let Some(room) = inner.viewers.get_mut(session_id) else {
            return 0;
        };
        room.remove(connection_id);
        let count = room.len();
        if count == 0 {
            inner.viewers.remove(session_id);
        }
        count
    }

    /// セッションの部屋にいる接続 ID のスナップショットを取得
    pub async fn viewers_of(&self, session_id: &SessionId) -> Vec<ConnectionId> {
        let inner = self.inner.lock().await;
        inner
            .viewers
            .get(session_id)
            .map(|room| room.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// セッションの現在の視聴者数を取得
    pub async fn viewer_count(&self, session_id: &SessionId) -> usize {
        let inner = self.inner.lock().await;
        inner.viewers.get(session_id).map_or(0, HashSet::len)
    }

    /// 接続をセッションのブロードキャスターとして登録する
    ///
    /// 既存のリンクは上書きされる。別の接続のリンクを上書きした場合、
    /// その古い接続 ID を返す（stale リンクの置き換えをログに残すため）。
    pub async fn register_broadcaster(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Option<ConnectionId> {
        let mut inner = self.inner.lock().await;
        inner
            .broadcasters
            .insert(session_id.clone(), connection_id.clone())
            .filter(|prev| prev != connection_id)
    }

    /// セッションのブロードキャスターリンクを解除する
    ///
    /// `connection_id` が現在のブロードキャスターである場合のみ解除し、
    /// あわせてこのセッションの通知済み集合をクリアする（clear-on-stop
    /// ポリシー）。それ以外の接続からの解除要求は無視して `false` を返す。
    pub async fn release_broadcaster(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.broadcasters.get(session_id) {
            Some(current) if current == connection_id => {
                inner.broadcasters.remove(session_id);
                inner.notified.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// セッションの現在のブロードキャスター接続を取得
    pub async fn broadcaster_of(&self, session_id: &SessionId) -> Option<ConnectionId> {
        let inner = self.inner.lock().await;
        inner.broadcasters.get(session_id).cloned()
    }

    /// 視聴者を通知済みとして記録する
    ///
    /// 初回の記録なら `true`、既に通知済みなら `false` を返す。呼び出し側は
    /// `false` のとき viewer-joined の送信を抑止する（重複ネゴシエーションの
    /// 防止）。記録は視聴者の切断か、ブロードキャスターリンクの解除まで残る。
    pub async fn mark_notified(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        inner
            .notified
            .entry(session_id.clone())
            .or_default()
            .insert(connection_id.clone())
    }

    /// 切断した接続に由来する状態を全セッションから取り除く
    ///
    /// - 全セッションの視聴者集合から接続を削除
    /// - 全セッションの通知済み集合から接続を削除
    /// - 接続がブロードキャスターだったセッションはリンクを解除し、
    ///   通知済み集合をクリアする（clear-on-stop ポリシー）
    ///
    /// 影響を受けたセッションごとの [`SessionCleanup`] を返す。
    pub async fn disconnect(&self, connection_id: &ConnectionId) -> Vec<SessionCleanup> {
        let mut inner = self.inner.lock().await;
        let mut cleanups: HashMap<SessionId, SessionCleanup> = HashMap::new();

        // 視聴者集合からの削除
        let affected: Vec<SessionId> = inner
            .viewers
            .iter()
            .filter(|(_, room)| room.contains(connection_id))
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in affected {
            let Some(room) = inner.viewers.get_mut(&session_id) else {
                continue;
            };
            room.remove(connection_id);
            let count = room.len();
            if count == 0 {
                inner.viewers.remove(&session_id);
            }
            cleanups.insert(
                session_id.clone(),
                SessionCleanup {
                    session_id,
                    removed_viewer: true,
                    viewer_count: count,
                    released_broadcaster: false,
                },
            );
        }

        // 通知済み集合からの削除（視聴者が再接続したら新規として扱うため）
        inner.notified.retain(|_, set| {
            set.remove(connection_id);
            !set.is_empty()
        });

        // ブロードキャスターリンクの解除
        let owned: Vec<SessionId> = inner
            .broadcasters
            .iter()
            .filter(|(_, broadcaster)| *broadcaster == connection_id)
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in owned {
            inner.broadcasters.remove(&session_id);
            inner.notified.remove(&session_id);
            let count = inner.viewers.get(&session_id).map_or(0, HashSet::len);
            cleanups
                .entry(session_id.clone())
                .and_modify(|c| c.released_broadcaster = true)
                .or_insert(SessionCleanup {
                    session_id,
                    removed_viewer: false,
                    viewer_count: count,
                    released_broadcaster: true,
                });
        }

        cleanups.into_values().collect()
    }
}

impl Default for LiveRoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
