// 統合テスト（単一ターゲット）

#[allow(dead_code)]
#[path = "../fixtures/mod.rs"]
mod fixtures;

mod test_backpressure;
mod test_hash_pipeline;
mod test_liveness;
mod test_spam_pipeline;
