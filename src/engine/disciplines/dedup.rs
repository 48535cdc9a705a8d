// 重複排除
// IDの解決はロック外で行い、チェック＆マークだけを単一ロックで保護する

use super::ItemFuture;
use crate::engine::barrier::{JoinBarrier, JoinOutcome};
use crate::engine::context::StageContext;
use crate::engine::stream::{StreamReceiver, StreamSender};
use futures::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// 転送済みキーの集合（単調増加）
///
/// パイプライン実行ごとに作成し、必要なステージへ注入する
#[derive(Debug)]
pub struct DedupSet<K> {
    seen: Arc<Mutex<HashSet<K>>>,
}

impl<K> Clone for DedupSet<K> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<K> Default for DedupSet<K> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash> DedupSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初出なら登録して`true`、既出なら`false`
    pub fn first_seen(&self, key: K) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `Some`なら転送、`None`なら重複として破棄
type Resolver<I, O> = Arc<dyn Fn(I) -> ItemFuture<Option<O>> + Send + Sync>;

pub struct Dedup<I, O> {
    resolver: Resolver<I, O>,
}

impl<I, O> Dedup<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// 新しい重複排除集合で構築
    pub fn new<K, F, Fut>(resolve: F) -> Self
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<(K, O)>> + Send + 'static,
    {
        Self::with_set(DedupSet::new(), resolve)
    }

    /// 既存の重複排除集合を注入して構築
    ///
    /// `resolve`はアイテムからキーと転送値を求める（ロック外で実行される）
    pub fn with_set<K, F, Fut>(set: DedupSet<K>, resolve: F) -> Self
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<(K, O)>> + Send + 'static,
    {
        let resolve = Arc::new(resolve);
        let resolver: Resolver<I, O> = Arc::new(move |item| {
            check_and_mark(set.clone(), resolve(item)).boxed()
        });
        Self { resolver }
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

            let resolver = Arc::clone(&self.resolver);
            let output = output.clone();
            let ctx = ctx.clone();
            barrier.spawn(async move {
                match resolver(item).await {
                    Ok(Some(value)) => {
                        ctx.emit(&output, value).await;
                    }
                    Ok(None) => ctx.dropped(),
                    Err(error) => ctx.failed(error).await,
                }
            });
        }

        barrier.wait().await
    }
}

async fn check_and_mark<K, O, Fut>(set: DedupSet<K>, resolution: Fut) -> anyhow::Result<Option<O>>
where
    K: Eq + Hash,
    Fut: Future<Output = anyhow::Result<(K, O)>>,
{
    // ロック外で解決
    let (key, value) = resolution.await?;

    if set.first_seen(key) {
        Ok(Some(value))
    } else {
        Ok(None)
    }
}
