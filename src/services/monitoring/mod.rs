// 進捗監視機能
// ステージ開始・完了、アイテム単位の失敗、パイプライン完了の報告

pub mod implementations;

// 公開API
pub use implementations::{NoOpReporter, TracingReporter};
