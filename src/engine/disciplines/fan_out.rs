// 無制限ファンアウト（任意でステージ単位の同時実行上限付き）

use super::ItemFuture;
use crate::core::PipelineResult;
use crate::engine::barrier::{JoinBarrier, JoinOutcome};
use crate::engine::context::StageContext;
use crate::engine::gate::PermitGate;
use crate::engine::stream::{StreamReceiver, StreamSender};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

type Transform<I, O> = Arc<dyn Fn(I) -> ItemFuture<Vec<O>> + Send + Sync>;

/// アイテムごとに独立したタスクを生成し、0個以上の派生アイテムを出力する
///
/// 出力順序は不定。`with_max_in_flight`を指定した場合、読み取りループは
/// タスク生成前にスロットを取得するため、同時実行タスク数は上限以下に保たれる
pub struct FanOut<I, O> {
    transform: Transform<I, O>,
    limit: Option<PermitGate>,
}

impl<I, O> FanOut<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F, Fut>(transform: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<O>>> + Send + 'static,
    {
        Self {
            transform: Arc::new(move |item| transform(item).boxed()),
            limit: None,
        }
    }

    /// 1対1の変換
    pub fn map<F, Fut>(transform: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        Self::new(move |item| transform(item).map(|result| result.map(|value| vec![value])))
    }

    /// ステージ単位の同時実行上限を設定（0は構築エラー）
    pub fn with_max_in_flight(mut self, limit: usize) -> PipelineResult<Self> {
        self.limit = Some(PermitGate::new("fan_out.max_in_flight", limit)?);
        Ok(self)
    }

    pub fn max_in_flight(&self) -> Option<usize> {
        self.limit.as_ref().map(PermitGate::capacity)
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

            // 上限付きの場合は空きが出るまで読み取りを止める
            let slot = match &self.limit {
                Some(limit) => match limit.acquire().await {
                    Ok(permit) => Some(permit),
                    Err(error) => {
                        ctx.failed(error.into()).await;
                        continue;
                    }
                },
                None => None,
            };

            let transform = Arc::clone(&self.transform);
            let output = output.clone();
            let ctx = ctx.clone();
            barrier.spawn_holding(slot, async move {
                match transform(item).await {
                    Ok(derived) => ctx.emit_all(&output, derived).await,
                    Err(error) => ctx.failed(error).await,
                }
            });
        }

        barrier.wait().await
    }
}
