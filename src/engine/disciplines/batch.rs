// バッチ処理
// サイズBに達したらバッファを独立タスクへ渡し、入力終了時に端数も発行する

use super::ItemFuture;
use crate::core::{PipelineError, PipelineResult};
use crate::engine::barrier::{JoinBarrier, JoinOutcome};
use crate::engine::context::StageContext;
use crate::engine::stream::{StreamReceiver, StreamSender};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

type BatchOperation<I, O> = Arc<dyn Fn(Vec<I>) -> ItemFuture<Vec<O>> + Send + Sync>;

pub struct Batch<I, O> {
    size: usize,
    operation: BatchOperation<I, O>,
}

impl<I, O> Batch<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F, Fut>(size: usize, operation: F) -> PipelineResult<Self>
    where
        F: Fn(Vec<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<O>>> + Send + 'static,
    {
        if size == 0 {
            return Err(PipelineError::validation(
                "batch_size",
                "バッチサイズは1以上である必要があります",
            ));
        }

        Ok(Self {
            size,
            operation: Arc::new(move |batch| operation(batch).boxed()),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) async fn run(
        self,
        mut input: StreamReceiver<I>,
        output: StreamSender<O>,
        ctx: &StageContext,
    ) -> JoinOutcome {
        let mut barrier = JoinBarrier::new(ctx.name());
        let mut buffer = Vec::with_capacity(self.size);

        while let Some(item) = input.recv().await {
            ctx.received();
            buffer.push(item);

            if buffer.len() == self.size {
                let full = std::mem::replace(&mut buffer, Vec::with_capacity(self.size));
                self.dispatch(full, &mut barrier, &output, ctx);
            }
        }

        // 端数バッチ
        if !buffer.is_empty() {
            self.dispatch(buffer, &mut barrier, &output, ctx);
        }

        barrier.wait().await
    }

    fn dispatch(
        &self,
        batch: Vec<I>,
        barrier: &mut JoinBarrier,
        output: &StreamSender<O>,
        ctx: &StageContext,
    ) {
        ctx.record_batch(batch.len());

        let operation = Arc::clone(&self.operation);
        let output = output.clone();
        let ctx = ctx.clone();
        barrier.spawn(async move {
            // 失敗時はバッチ全体の寄与を破棄する
            match operation(batch).await {
                Ok(results) => ctx.emit_all(&output, results).await,
                Err(error) => ctx.failed(error).await,
            }
        });
    }
}
