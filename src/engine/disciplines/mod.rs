// 並行処理方式の実装
// 各方式は入力ストリームを最後まで読み切り、生成した全タスクの完了後に戻る

pub mod batch;
pub mod combine;
pub mod dedup;
pub mod fan_out;
pub mod indexed;
pub mod rate_gated;

pub use batch::Batch;
pub use combine::Combine;
pub use dedup::{Dedup, DedupSet};
pub use fan_out::FanOut;
pub use indexed::Indexed;
pub use rate_gated::RateGated;

use futures::future::BoxFuture;

/// アイテム単位の非同期処理結果
pub type ItemFuture<T> = BoxFuture<'static, anyhow::Result<T>>;
