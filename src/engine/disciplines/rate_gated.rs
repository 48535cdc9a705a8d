// グローバルレート制限付きファンアウト
// 特定の操作種別だけを共有ゲートで制限し、同じアイテムの他の操作は並行に進める

use super::ItemFuture;
use crate::engine::barrier::{JoinBarrier, JoinOutcome};
use crate::engine::context::StageContext;
use crate::engine::gate::PermitGate;
use crate::engine::stream::{StreamReceiver, StreamSender};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

type GatedTransform<I, O> = Arc<dyn Fn(I, PermitGate) -> ItemFuture<Vec<O>> + Send + Sync>;

/// アイテムごとにタスクを生成し、変換関数にゲートを渡す
///
/// 変換関数は制限対象の呼び出しの直前に`gate.run(...)`で取得し、直後に解放する。
/// ゲートは操作種別単位で共有されるため、複数ステージに同じゲートを渡せば
/// プロセス全体での上限になる
pub struct RateGated<I, O> {
    gate: PermitGate,
    transform: GatedTransform<I, O>,
}

impl<I, O> RateGated<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F, Fut>(gate: PermitGate, transform: F) -> Self
    where
        F: Fn(I, PermitGate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<O>>> + Send + 'static,
    {
        Self {
            gate,
            transform: Arc::new(move |item, gate| transform(item, gate).boxed()),
        }
    }

    pub fn gate(&self) -> &PermitGate {
        &self.gate
    }

    pub(crate) async fn run(
        self,
        mut input: StreamReceiver<I>,
        output: StreamSender<O>,
        ctx: &StageContext,
    ) -> JoinOutcome {
        let mut barrier = JoinBarrier::new(ctx.name());

        while let Some(item) = input.recv().await {
            ctx.received();

            // アイテム毎に専用の結果経路を持つ（タスク間で結果チャンネルを共有しない）
            let transform = Arc::clone(&self.transform);
            let gate = self.gate.clone();
            let output = output.clone();
            let ctx = ctx.clone();
            barrier.spawn(async move {
                match transform(item, gate).await {
                    Ok(derived) => ctx.emit_all(&output, derived).await,
                    Err(error) => ctx.failed(error).await,
                }
            });
        }

        barrier.wait().await
    }
}
