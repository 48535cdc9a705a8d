// 進捗監視の具象実装

use crate::core::{PipelineReporter, PipelineSummary, StageReport};
use async_trait::async_trait;

/// tracingによる進捗報告実装
#[derive(Debug, Default, Clone)]
pub struct TracingReporter {
    quiet: bool,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 失敗の警告以外を出力しない
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

#[async_trait]
impl PipelineReporter for TracingReporter {
    async fn report_started(&self, stage_count: usize) {
        if !self.quiet {
            tracing::info!(stage_count, "パイプライン開始");
        }
    }

    async fn report_stage_started(&self, stage: &str, discipline: &str) {
        if !self.quiet {
            tracing::info!(stage, discipline, "ステージ開始");
        }
    }

    async fn report_item_failed(&self, stage: &str, error: &str) {
        tracing::warn!(stage, error, "アイテム処理に失敗しました");
    }

    async fn report_stage_completed(&self, report: &StageReport) {
        if !self.quiet {
            tracing::info!(
                stage = %report.name,
                received = report.received,
                emitted = report.emitted,
                dropped = report.dropped,
                failed = report.failed,
                peak_in_flight = report.peak_in_flight,
                elapsed_ms = report.elapsed_ms,
                "ステージ完了"
            );
        }
    }

    async fn report_completed(&self, summary: &PipelineSummary) {
        if !self.quiet {
            tracing::info!(
                stages = summary.stages.len(),
                failed = summary.total_failed(),
                total_time_ms = summary.total_time_ms,
                "パイプライン完了"
            );
        }
    }
}

/// 何もしない進捗報告実装（テスト・ベンチマーク用）
#[derive(Debug, Default, Clone)]
pub struct NoOpReporter;

impl NoOpReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineReporter for NoOpReporter {
    async fn report_started(&self, _stage_count: usize) {
        // 何もしない
    }

    async fn report_stage_started(&self, _stage: &str, _discipline: &str) {
        // 何もしない
    }

    async fn report_item_failed(&self, _stage: &str, _error: &str) {
        // 何もしない
    }

    async fn report_stage_completed(&self, _report: &StageReport) {
        // 何もしない
    }

    async fn report_completed(&self, _summary: &PipelineSummary) {
        // 何もしない
    }
}
