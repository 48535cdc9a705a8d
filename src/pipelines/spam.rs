// スパム判定パイプライン
// Source -> SelectUsers(重複排除) -> SelectMessages(バッチ) -> CheckSpam(上限付きファンアウト) -> CombineResults

use crate::core::{
    EngineConfig, IdentityLookup, MessageStore, MsgData, MsgId, PipelineResult, SpamChecker, User,
};
use crate::engine::{Batch, Combine, Dedup, DedupSet, FanOut, Pipeline, Stage};
use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

/// パイプラインが利用する外部サービス一式
#[derive(Clone)]
pub struct SpamServices {
    pub lookup: Arc<dyn IdentityLookup>,
    pub store: Arc<dyn MessageStore>,
    pub checker: Arc<dyn SpamChecker>,
}

impl SpamServices {
    pub fn new(
        lookup: Arc<dyn IdentityLookup>,
        store: Arc<dyn MessageStore>,
        checker: Arc<dyn SpamChecker>,
    ) -> Self {
        Self {
            lookup,
            store,
            checker,
        }
    }

    /// 3つのトレイトを全て実装する単一のサービスから構築
    pub fn shared<S>(service: Arc<S>) -> Self
    where
        S: IdentityLookup + MessageStore + SpamChecker + 'static,
    {
        Self {
            lookup: Arc::clone(&service) as Arc<dyn IdentityLookup>,
            store: Arc::clone(&service) as Arc<dyn MessageStore>,
            checker: service,
        }
    }
}

/// スパムを先に、同じ判定内ではID昇順
pub fn spam_first(a: &MsgData, b: &MsgData) -> Ordering {
    (Reverse(a.has_spam), a.id).cmp(&(Reverse(b.has_spam), b.id))
}

/// 実行ごとに新しい重複排除集合を作成してパイプラインを構築
pub fn build<C>(
    emails: Vec<String>,
    services: &SpamServices,
    config: &C,
) -> PipelineResult<Pipeline<MsgData>>
where
    C: EngineConfig + ?Sized,
{
    build_with_dedup(emails, services, DedupSet::new(), config)
}

/// 重複排除集合を注入してパイプラインを構築
///
/// バッチサイズとチェックの同時実行数は、設定値と各サービスの上限の小さい方を使う
pub fn build_with_dedup<C>(
    emails: Vec<String>,
    services: &SpamServices,
    seen: DedupSet<u64>,
    config: &C,
) -> PipelineResult<Pipeline<MsgData>>
where
    C: EngineConfig + ?Sized,
{
    let batch_size = config.batch_size().min(services.store.max_batch_size());
    let max_checks = config
        .max_in_flight_checks()
        .min(services.checker.max_concurrent_requests());
    tracing::debug!(batch_size, max_checks, "スパム判定パイプラインを構築");

    Ok(Pipeline::from_seeds("Source", emails)
        .then(Stage::new(
            "SelectUsers",
            select_users(Arc::clone(&services.lookup), seen),
        ))
        .then(Stage::new(
            "SelectMessages",
            select_messages(Arc::clone(&services.store), batch_size)?,
        ))
        .then(Stage::new(
            "CheckSpam",
            check_spam(Arc::clone(&services.checker), max_checks)?,
        ))
        .then(Stage::new(
            "CombineResults",
            Combine::each(spam_first, |record: MsgData| record),
        ))
        .with_stream_capacity(config.stream_capacity()))
}

fn select_users(lookup: Arc<dyn IdentityLookup>, seen: DedupSet<u64>) -> Dedup<String, User> {
    Dedup::with_set(seen, move |email: String| {
        let lookup = Arc::clone(&lookup);
        async move {
            let user = lookup.resolve(&email).await?;
            Ok((user.id, user))
        }
    })
}

fn select_messages(
    store: Arc<dyn MessageStore>,
    batch_size: usize,
) -> PipelineResult<Batch<User, MsgId>> {
    Batch::new(batch_size, move |users: Vec<User>| {
        let store = Arc::clone(&store);
        async move { store.lookup_batch(&users).await }
    })
}

fn check_spam(
    checker: Arc<dyn SpamChecker>,
    max_checks: usize,
) -> PipelineResult<FanOut<MsgId, MsgData>> {
    FanOut::map(move |id: MsgId| {
        let checker = Arc::clone(&checker);
        async move {
            let has_spam = checker.check(id).await?;
            Ok(MsgData { id, has_spam })
        }
    })
    .with_max_in_flight(max_checks)
}
