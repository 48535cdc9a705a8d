// StageContext - ステージ実行中のカウンターと報告先
// ステージ本体と、そこから生成された全タスクで共有される

use super::barrier::JoinOutcome;
use super::stream::{emit, StreamSender};
use crate::core::{DisciplineKind, PipelineError, PipelineReporter, StageReport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

#[derive(Debug, Default)]
struct StageCounters {
    received: AtomicUsize,
    emitted: AtomicUsize,
    dropped: AtomicUsize,
    failed: AtomicUsize,
    batches: Mutex<Vec<usize>>,
}

/// ステージ単位の実行コンテキスト（クローンは同じカウンターを共有）
#[derive(Clone)]
pub struct StageContext {
    name: Arc<str>,
    kind: DisciplineKind,
    reporter: Arc<dyn PipelineReporter>,
    counters: Arc<StageCounters>,
    started: Instant,
}

impl StageContext {
    pub fn new(
        name: impl Into<String>,
        kind: DisciplineKind,
        reporter: Arc<dyn PipelineReporter>,
    ) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            kind,
            reporter,
            counters: Arc::new(StageCounters::default()),
            started: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DisciplineKind {
        self.kind
    }

    pub async fn started(&self) {
        tracing::debug!(stage = %self.name, discipline = %self.kind, "ステージ開始");
        self.reporter
            .report_stage_started(&self.name, self.kind.as_str())
            .await;
    }

    pub fn received(&self) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);
    }

    /// 重複等による意図的な破棄（エラーではない）
    pub fn dropped(&self) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self, size: usize) {
        self.counters
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(size);
    }

    /// アイテム単位の失敗 - ログに残してアイテムを破棄する
    ///
    /// エンジン由来のエラーはそのまま、それ以外は外部サービスのエラーとして扱う
    pub async fn failed(&self, error: anyhow::Error) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        let error = match error.downcast::<PipelineError>() {
            Ok(error) => error,
            Err(error) => PipelineError::collaborator(self.name.to_string(), error),
        };
        if error.is_recoverable() {
            tracing::warn!(
                stage = %self.name,
                severity = error.severity().as_str(),
                error = %error,
                "アイテムを破棄しました"
            );
        } else {
            tracing::error!(
                stage = %self.name,
                severity = error.severity().as_str(),
                error = %error,
                "回復不能なエラーでアイテムを破棄しました"
            );
        }
        self.reporter
            .report_item_failed(&self.name, &error.to_string())
            .await;
    }

    /// 下流へ送信し、成功した場合のみ送信数を加算
    pub async fn emit<T>(&self, output: &StreamSender<T>, item: T) -> bool {
        let sent = emit(output, item).await;
        if sent {
            self.counters.emitted.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }

    /// 複数アイテムを順に送信
    pub async fn emit_all<T>(&self, output: &StreamSender<T>, items: Vec<T>) {
        for item in items {
            if !self.emit(output, item).await {
                break;
            }
        }
    }

    /// カウンターとバリア結果からレポートを確定させる
    pub async fn finish(&self, outcome: JoinOutcome) -> StageReport {
        let mut report = StageReport::new(self.name.to_string(), self.kind);
        report.received = self.counters.received.load(Ordering::Relaxed);
        report.emitted = self.counters.emitted.load(Ordering::Relaxed);
        report.dropped = self.counters.dropped.load(Ordering::Relaxed);
        report.failed = self.counters.failed.load(Ordering::Relaxed) + outcome.panicked;
        report.batches = self
            .counters
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        report.peak_in_flight = outcome.peak_in_flight;
        report.elapsed_ms = self.started.elapsed().as_millis() as u64;

        tracing::debug!(
            stage = %self.name,
            received = report.received,
            emitted = report.emitted,
            dropped = report.dropped,
            failed = report.failed,
            "ステージ完了、出力ストリームを閉じます"
        );
        self.reporter.report_stage_completed(&report).await;
        report
    }
}
