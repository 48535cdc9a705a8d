// パイプラインのトレイト定義
// 設定・進捗報告・外部サービスの抽象化インターフェースを定義

use super::types::{MsgId, PipelineSummary, StageReport, User};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// エンジン設定を抽象化するトレイト
#[automock]
pub trait EngineConfig: Send + Sync {
    /// ステージ間ストリームのバッファ容量（1で最小限のバッファリング）
    fn stream_capacity(&self) -> usize;

    /// 固定幅インデックス付きファンアウトの幅
    fn fan_out_width(&self) -> usize;

    /// レート制限付き操作の同時実行上限
    fn rate_gate_capacity(&self) -> usize;

    /// バッチサイズ
    fn batch_size(&self) -> usize;

    /// チェック操作の同時実行上限
    fn max_in_flight_checks(&self) -> usize;

    /// 結合時の区切り文字
    fn join_separator(&self) -> String;
}

impl EngineConfig for Box<dyn EngineConfig> {
    fn stream_capacity(&self) -> usize {
        self.as_ref().stream_capacity()
    }

    fn fan_out_width(&self) -> usize {
        self.as_ref().fan_out_width()
    }

    fn rate_gate_capacity(&self) -> usize {
        self.as_ref().rate_gate_capacity()
    }

    fn batch_size(&self) -> usize {
        self.as_ref().batch_size()
    }

    fn max_in_flight_checks(&self) -> usize {
        self.as_ref().max_in_flight_checks()
    }

    fn join_separator(&self) -> String {
        self.as_ref().join_separator()
    }
}

/// 進捗報告の抽象化トレイト
#[automock]
#[async_trait]
pub trait PipelineReporter: Send + Sync {
    /// パイプライン開始時の報告
    async fn report_started(&self, stage_count: usize);

    /// ステージ開始時の報告
    async fn report_stage_started(&self, stage: &str, discipline: &str);

    /// アイテム単位の失敗を報告（アイテムは破棄される）
    async fn report_item_failed(&self, stage: &str, error: &str);

    /// ステージ完了時の報告
    async fn report_stage_completed(&self, report: &StageReport);

    /// パイプライン完了時の報告
    async fn report_completed(&self, summary: &PipelineSummary);
}

/// ハッシュ系プリミティブ
///
/// `digest_a`は同時実行数に制約なし、`digest_b`は外部で同時実行数が
/// 制限されている前提で、呼び出し側がゲートを通して使用する
#[automock]
#[async_trait]
pub trait Signer: Send + Sync {
    async fn digest_a(&self, input: &str) -> Result<String>;

    async fn digest_b(&self, input: &str) -> Result<String>;
}

/// キーからユーザーIDを解決する（低速な可能性あり、ロック外で呼ぶこと）
#[automock]
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn resolve(&self, key: &str) -> Result<User>;
}

/// 複数ユーザー分のメッセージIDをまとめて取得する
#[automock]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 一度に渡せるユーザー数の上限
    fn max_batch_size(&self) -> usize;

    async fn lookup_batch(&self, users: &[User]) -> Result<Vec<MsgId>>;
}

/// メッセージ単位のスパム判定
#[automock]
#[async_trait]
pub trait SpamChecker: Send + Sync {
    /// 同時リクエスト数の上限
    fn max_concurrent_requests(&self) -> usize;

    async fn check(&self, id: MsgId) -> Result<bool>;
}
