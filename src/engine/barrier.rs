// JoinBarrier - ステージ内で生成したタスクの完了を待つカウンター
// 全タスクの完了後にのみ出力ストリームを閉じるために使う

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

/// バリアの待機結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOutcome {
    pub spawned: usize,
    /// パニックで終了したタスク数
    pub panicked: usize,
    pub peak_in_flight: usize,
}

/// 生成前にインクリメントし、タスク終了時にデクリメントする完了カウンター
pub struct JoinBarrier {
    stage: String,
    tasks: JoinSet<()>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    spawned: usize,
    panicked: usize,
}

/// タスク終了（正常・パニック問わず）でカウンタを戻すガード
struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl JoinBarrier {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            tasks: JoinSet::new(),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            spawned: 0,
            panicked: 0,
        }
    }

    /// タスクを生成（読み取りループは完了を待たずに続行できる）
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_holding((), task);
    }

    /// `held`をタスク終了まで保持してタスクを生成
    ///
    /// `held`の解放は実行中カウンタの減算より後になる
    pub fn spawn_holding<H, F>(&mut self, held: H, task: F)
    where
        H: Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = ActiveGuard {
            active: Arc::clone(&self.active),
        };

        self.tasks.spawn(async move {
            let _held = held;
            let _guard = guard;
            task.await;
        });
        self.spawned += 1;

        // 完了済みタスクを回収してJoinSetの肥大化を防ぐ
        while let Some(result) = self.tasks.try_join_next() {
            self.record(result);
        }
    }

    /// 現在実行中のタスク数
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// 全タスクの完了を待機
    pub async fn wait(mut self) -> JoinOutcome {
        while let Some(result) = self.tasks.join_next().await {
            self.record(result);
        }

        JoinOutcome {
            spawned: self.spawned,
            panicked: self.panicked,
            peak_in_flight: self.peak.load(Ordering::SeqCst),
        }
    }

    fn record(&mut self, result: Result<(), JoinError>) {
        if let Err(error) = result {
            self.panicked += 1;
            tracing::error!(stage = %self.stage, %error, "タスクが異常終了しました");
        }
    }
}
