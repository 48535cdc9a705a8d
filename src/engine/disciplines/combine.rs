// ソート済み結合（シンク）
// 入力を全て蓄積し、終了時に決定的な全順序で並べてから出力する

use crate::engine::barrier::JoinOutcome;
use crate::engine::context::StageContext;
use crate::engine::stream::{StreamReceiver, StreamSender};
use std::cmp::Ordering;
use std::sync::Arc;

type Comparator<I> = Arc<dyn Fn(&I, &I) -> Ordering + Send + Sync>;

enum Finish<I, O> {
    /// 全体を1つの値に結合
    Join(Box<dyn FnOnce(Vec<I>) -> O + Send>),
    /// 1入力につき1出力
    Each(Box<dyn Fn(I) -> O + Send + Sync>),
}

pub struct Combine<I, O> {
    compare: Comparator<I>,
    finish: Finish<I, O>,
}

impl<I, O> Combine<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// ソート後に1つの値へ結合する（入力が空でも必ず1件出力する）
    pub fn join<C, J>(compare: C, join: J) -> Self
    where
        C: Fn(&I, &I) -> Ordering + Send + Sync + 'static,
        J: FnOnce(Vec<I>) -> O + Send + 'static,
    {
        Self {
            compare: Arc::new(compare),
            finish: Finish::Join(Box::new(join)),
        }
    }

    /// ソート後に1件ずつ出力する
    pub fn each<C, M>(compare: C, map: M) -> Self
    where
        C: Fn(&I, &I) -> Ordering + Send + Sync + 'static,
        M: Fn(I) -> O + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
            finish: Finish::Each(Box::new(map)),
        }
    }

    pub(crate) async fn run(
        self,
        mut input: StreamReceiver<I>,
        output: StreamSender<O>,
        ctx: &StageContext,
    ) -> JoinOutcome {
        // このステージだけは入力を全て読み切るまで何も出力しない
        let mut collected = Vec::new();
        while let Some(item) = input.recv().await {
            ctx.received();
            collected.push(item);
        }

        collected.sort_by(|a, b| (self.compare)(a, b));

        match self.finish {
            Finish::Join(join) => {
                // 入力が空でも結合結果を1件出力する
                let joined = join(collected);
                ctx.emit(&output, joined).await;
            }
            Finish::Each(map) => {
                for item in collected {
                    let value = map(item);
                    if !ctx.emit(&output, value).await {
                        break;
                    }
                }
            }
        }

        JoinOutcome::default()
    }
}

impl Combine<String, String> {
    /// 昇順に並べて区切り文字で連結
    pub fn join_sorted(separator: impl Into<String>) -> Self {
        let separator = separator.into();
        Self::join(|a: &String, b: &String| a.cmp(b), move |items| items.join(&separator))
    }
}
