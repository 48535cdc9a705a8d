// サービス層 - 報告・設定・外部サービスの具象実装
// エンジンはトレイト経由でのみ参照し、具体的な実装には依存しない

pub mod config;
pub mod mailbox;
pub mod monitoring;
pub mod signer;

// 公開API - 各サービスの主要機能を明示的にエクスポート
pub use config::DefaultEngineConfig;
pub use mailbox::{InMemoryMailbox, MailboxFixture, MailboxUser};
pub use monitoring::{NoOpReporter, TracingReporter};
pub use signer::DigestSigner;
