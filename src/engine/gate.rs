// PermitGate - 同時実行数を制限するカウンティングセマフォ
// ステージ単位の上限と、操作種別ごとのプロセス全体のレート制限の両方に使う

use crate::core::{PipelineError, PipelineResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 容量Kのパーミットゲート
///
/// クローンは同じパーミットを共有する。操作種別ごとに1つ作成して
/// 必要なタスクへ注入する
#[derive(Debug, Clone)]
pub struct PermitGate {
    name: Arc<str>,
    capacity: usize,
    semaphore: Arc<Semaphore>,
}

/// 取得済みパーミット - ドロップで解放される
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl PermitGate {
    /// 新しいゲートを作成（容量0は構築エラー）
    pub fn new(name: impl Into<String>, capacity: usize) -> PipelineResult<Self> {
        let name: String = name.into();
        if capacity == 0 {
            return Err(PipelineError::configuration(format!(
                "ゲート {name} の容量は1以上である必要があります"
            )));
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(PipelineError::configuration(format!(
                "ゲート {name} の容量が上限を超えています: {capacity}"
            )));
        }

        Ok(Self {
            name: Arc::from(name),
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 現在保持されているパーミット数
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// パーミットを取得（空きが出るまで待機）
    ///
    /// `close`済みのゲートからは取得できない
    pub async fn acquire(&self) -> PipelineResult<GatePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| {
                PipelineError::internal(anyhow::anyhow!("ゲート {} を取得できません: {e}", self.name))
            })?;
        Ok(GatePermit { _permit: permit })
    }

    /// パーミットを保持したまま操作を実行し、完了直後に解放する
    pub async fn run<F, T>(&self, operation: F) -> PipelineResult<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(operation.await)
    }

    /// ゲートを閉じる（待機中・以降の取得は全てエラーになる）
    pub fn close(&self) {
        tracing::debug!(gate = %self.name, "ゲートを閉じます");
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}
