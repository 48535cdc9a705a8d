// パイプラインに関連するデータ型定義

use serde::{Deserialize, Serialize};
use std::fmt;

/// ステージの並行処理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisciplineKind {
    Source,
    FanOut,
    RateGated,
    Indexed,
    Dedup,
    Batch,
    Combine,
}

impl DisciplineKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::FanOut => "fan_out",
            Self::RateGated => "rate_gated",
            Self::Indexed => "indexed",
            Self::Dedup => "dedup",
            Self::Batch => "batch",
            Self::Combine => "combine",
        }
    }
}

impl fmt::Display for DisciplineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 単一ステージの実行結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub name: String,
    pub discipline: DisciplineKind,
    /// 入力ストリームから受信したアイテム数
    pub received: usize,
    /// 出力ストリームへ送信したアイテム数
    pub emitted: usize,
    /// 重複として破棄したアイテム数
    pub dropped: usize,
    /// 外部サービスの失敗やパニックで破棄したアイテム数
    pub failed: usize,
    /// 発行したバッチのサイズ（発行順）
    pub batches: Vec<usize>,
    /// 同時実行中タスク数の最大値
    pub peak_in_flight: usize,
    /// ステージ本体がパニックで終了したかどうか
    pub aborted: bool,
    pub elapsed_ms: u64,
}

impl StageReport {
    pub fn new(name: impl Into<String>, discipline: DisciplineKind) -> Self {
        Self {
            name: name.into(),
            discipline,
            received: 0,
            emitted: 0,
            dropped: 0,
            failed: 0,
            batches: Vec::new(),
            peak_in_flight: 0,
            aborted: false,
            elapsed_ms: 0,
        }
    }
}

/// パイプライン全体のサマリー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub stages: Vec<StageReport>,
    pub total_time_ms: u64,
}

impl PipelineSummary {
    /// 名前でステージレポートを検索
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.name == name)
    }

    /// 全ステージの失敗アイテム合計
    pub fn total_failed(&self) -> usize {
        self.stages.iter().map(|report| report.failed).sum()
    }
}

/// Executorの戻り値 - シンクが出力したアイテムと実行サマリー
#[derive(Debug, Clone)]
pub struct PipelineOutput<T> {
    pub items: Vec<T>,
    pub summary: PipelineSummary,
}

/// メッセージID
pub type MsgId = u64;

/// ID解決の結果として得られるユーザー
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
}

/// スパム判定の結果レコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsgData {
    pub id: MsgId,
    pub has_spam: bool,
}

impl fmt::Display for MsgData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.has_spam, self.id)
    }
}
