// 固定幅インデックス付きファンアウト
// アイテムごとにW個のサブタスクを生成し、完了順ではなくインデックス順に再構成する

use super::ItemFuture;
use crate::core::{PipelineError, PipelineResult};
use crate::engine::barrier::{JoinBarrier, JoinOutcome};
use crate::engine::context::StageContext;
use crate::engine::stream::{StreamReceiver, StreamSender};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;

type ItemRunner<I, O> = Arc<dyn Fn(I) -> ItemFuture<O> + Send + Sync>;

pub struct Indexed<I, O> {
    width: usize,
    runner: ItemRunner<I, O>,
}

impl<I, O> Indexed<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    /// `part(i, item)`を0..W-1について並行に実行し、`assemble`でスロット順に結合する
    pub fn new<P, F, Fut, A>(width: usize, part: F, assemble: A) -> PipelineResult<Self>
    where
        P: Send + 'static,
        F: Fn(usize, Arc<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<P>> + Send + 'static,
        A: Fn(&I, Vec<P>) -> O + Send + Sync + 'static,
    {
        if width == 0 {
            return Err(PipelineError::validation(
                "fan_out_width",
                "ファンアウト幅は1以上である必要があります",
            ));
        }

        let part = Arc::new(part);
        let assemble = Arc::new(assemble);
        let runner: ItemRunner<I, O> = Arc::new(move |item: I| {
            reassemble(width, item, Arc::clone(&part), Arc::clone(&assemble)).boxed()
        });

        Ok(Self { width, runner })
    }

    pub fn width(&self) -> usize {
        self.width
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

            let runner = Arc::clone(&self.runner);
            let output = output.clone();
            let ctx = ctx.clone();
            barrier.spawn(async move {
                match runner(item).await {
                    Ok(value) => {
                        ctx.emit(&output, value).await;
                    }
                    Err(error) => ctx.failed(error).await,
                }
            });
        }

        barrier.wait().await
    }
}

impl<I> Indexed<I, String>
where
    I: Send + Sync + 'static,
{
    /// 文字列の部分結果をインデックス順に連結する
    pub fn concat<F, Fut>(width: usize, part: F) -> PipelineResult<Self>
    where
        F: Fn(usize, Arc<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        Self::new(width, part, |_, parts: Vec<String>| parts.concat())
    }
}

async fn reassemble<I, O, P, F, Fut, A>(
    width: usize,
    item: I,
    part: Arc<F>,
    assemble: Arc<A>,
) -> anyhow::Result<O>
where
    I: Send + Sync + 'static,
    P: Send + 'static,
    F: Fn(usize, Arc<I>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<P>> + Send + 'static,
    A: Fn(&I, Vec<P>) -> O + Send + Sync + 'static,
{
    let item = Arc::new(item);
    let slots = fill_slots(width, |index| part(index, Arc::clone(&item))).await?;
    Ok(assemble(item.as_ref(), slots))
}

/// W個のサブタスクを実行し、各結果を自分のインデックスのスロットに書き込む
async fn fill_slots<P, F, Fut>(width: usize, part: F) -> anyhow::Result<Vec<P>>
where
    P: Send + 'static,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = anyhow::Result<P>> + Send + 'static,
{
    let mut slots: Vec<Option<P>> = (0..width).map(|_| None).collect();
    let mut tasks = JoinSet::new();
    for index in 0..width {
        let sub_task = part(index);
        tasks.spawn(async move { (index, sub_task.await) });
    }

    while let Some(joined) = tasks.join_next().await {
        let (index, result) =
            joined.map_err(|e| anyhow::anyhow!("サブタスクが異常終了しました: {e}"))?;
        slots[index] = Some(result?);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.ok_or_else(|| anyhow::anyhow!("スロット{index}が未設定です")))
        .collect()
}
