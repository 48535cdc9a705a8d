// Stage - 宣言的なステージ設定（名前 + 並行処理方式 + 変換関数）

use super::context::StageContext;
use super::disciplines::{Batch, Combine, Dedup, FanOut, Indexed, RateGated};
use super::stream::{StreamReceiver, StreamSender};
use crate::core::{DisciplineKind, StageReport};

/// ステージの並行処理方式
pub enum Discipline<I, O> {
    FanOut(FanOut<I, O>),
    RateGated(RateGated<I, O>),
    Indexed(Indexed<I, O>),
    Dedup(Dedup<I, O>),
    Batch(Batch<I, O>),
    Combine(Combine<I, O>),
}

impl<I, O> Discipline<I, O> {
    pub fn kind(&self) -> DisciplineKind {
        match self {
            Self::FanOut(_) => DisciplineKind::FanOut,
            Self::RateGated(_) => DisciplineKind::RateGated,
            Self::Indexed(_) => DisciplineKind::Indexed,
            Self::Dedup(_) => DisciplineKind::Dedup,
            Self::Batch(_) => DisciplineKind::Batch,
            Self::Combine(_) => DisciplineKind::Combine,
        }
    }
}

impl<I, O> From<FanOut<I, O>> for Discipline<I, O> {
    fn from(discipline: FanOut<I, O>) -> Self {
        Self::FanOut(discipline)
    }
}

impl<I, O> From<RateGated<I, O>> for Discipline<I, O> {
    fn from(discipline: RateGated<I, O>) -> Self {
        Self::RateGated(discipline)
    }
}

impl<I, O> From<Indexed<I, O>> for Discipline<I, O> {
    fn from(discipline: Indexed<I, O>) -> Self {
        Self::Indexed(discipline)
    }
}

impl<I, O> From<Dedup<I, O>> for Discipline<I, O> {
    fn from(discipline: Dedup<I, O>) -> Self {
        Self::Dedup(discipline)
    }
}

impl<I, O> From<Batch<I, O>> for Discipline<I, O> {
    fn from(discipline: Batch<I, O>) -> Self {
        Self::Batch(discipline)
    }
}

impl<I, O> From<Combine<I, O>> for Discipline<I, O> {
    fn from(discipline: Combine<I, O>) -> Self {
        Self::Combine(discipline)
    }
}

/// 入力ストリームを読み、出力ストリームへ書き込む処理単位
pub struct Stage<I, O> {
    name: String,
    discipline: Discipline<I, O>,
}

impl<I, O> Stage<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn new(name: impl Into<String>, discipline: impl Into<Discipline<I, O>>) -> Self {
        Self {
            name: name.into(),
            discipline: discipline.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DisciplineKind {
        self.discipline.kind()
    }

    /// ステージ本体を実行
    ///
    /// 入力を読み切り、生成した全タスクの完了を待ってから戻る。
    /// 出力ストリームは`output`のドロップ（＝この関数の終了）で閉じられる
    pub(crate) async fn run(
        self,
        input: StreamReceiver<I>,
        output: StreamSender<O>,
        ctx: StageContext,
    ) -> StageReport {
        ctx.started().await;

        let outcome = match self.discipline {
            Discipline::FanOut(d) => d.run(input, output, &ctx).await,
            Discipline::RateGated(d) => d.run(input, output, &ctx).await,
            Discipline::Indexed(d) => d.run(input, output, &ctx).await,
            Discipline::Dedup(d) => d.run(input, output, &ctx).await,
            Discipline::Batch(d) => d.run(input, output, &ctx).await,
            Discipline::Combine(d) => d.run(input, output, &ctx).await,
        };

        ctx.finish(outcome).await
    }
}
