// Pipeline Executor - ステージ間をストリームで接続し、各ステージを独立タスクとして実行

use super::collector::spawn_output_collector;
use super::context::StageContext;
use super::stage::Stage;
use super::stream::{stream, validate_capacity, StreamSender, DEFAULT_STREAM_CAPACITY};
use crate::core::{
    DisciplineKind, PipelineError, PipelineOutput, PipelineReporter, PipelineResult,
    PipelineSummary, StageReport,
};
use crate::services::NoOpReporter;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Instant;

/// 起動待ちのステージ
struct StageTask {
    name: String,
    kind: DisciplineKind,
    body: BoxFuture<'static, StageReport>,
}

/// 実行時にストリームを作成しながらステージを組み立てるための状態
struct Wiring {
    capacity: usize,
    reporter: Arc<dyn PipelineReporter>,
    tasks: Vec<StageTask>,
}

/// 末尾ステージの出力先を受け取り、それより前の全ステージを接続する関数
type Wire<T> = Box<dyn FnOnce(StreamSender<T>, &mut Wiring) + Send>;

/// ステージの順序付きリスト（ソースから末尾まで）
///
/// `run`は自身を消費するため、同じ構成を二度実行することはできない
pub struct Pipeline<T> {
    stage_names: Vec<String>,
    wire: Wire<T>,
    stream_capacity: usize,
    reporter: Arc<dyn PipelineReporter>,
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    /// 呼び出し側が用意した有限のシード列を流すソースステージから開始
    pub fn from_seeds(name: impl Into<String>, seeds: Vec<T>) -> Self {
        let name: String = name.into();
        let source_name = name.clone();

        let wire: Wire<T> = Box::new(move |output, wiring| {
            let ctx = StageContext::new(
                source_name.clone(),
                DisciplineKind::Source,
                Arc::clone(&wiring.reporter),
            );
            wiring.tasks.push(StageTask {
                name: source_name,
                kind: DisciplineKind::Source,
                body: run_source(seeds, output, ctx).boxed(),
            });
        });

        Self {
            stage_names: vec![name],
            wire,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            reporter: Arc::new(NoOpReporter::new()),
        }
    }

    /// 末尾にステージを追加
    pub fn then<U>(self, stage: Stage<T, U>) -> Pipeline<U>
    where
        T: Sync,
        U: Send + 'static,
    {
        let Self {
            mut stage_names,
            wire: upstream,
            stream_capacity,
            reporter,
        } = self;
        stage_names.push(stage.name().to_string());

        let wire: Wire<U> = Box::new(move |output, wiring| {
            let (tx, rx) = stream(wiring.capacity);
            upstream(tx, wiring);

            let name = stage.name().to_string();
            let kind = stage.kind();
            let ctx = StageContext::new(name.clone(), kind, Arc::clone(&wiring.reporter));
            wiring.tasks.push(StageTask {
                name,
                kind,
                body: stage.run(rx, output, ctx).boxed(),
            });
        });

        Pipeline {
            stage_names,
            wire,
            stream_capacity,
            reporter,
        }
    }

    /// ステージ間ストリームの容量を設定
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn PipelineReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn stage_names(&self) -> &[String] {
        &self.stage_names
    }

    /// パイプラインを実行し、末尾ステージが出力した全アイテムを返す
    ///
    /// 各ステージは独立タスクとして起動され、出力ストリームはステージ本体の終了時
    /// （正常終了・パニック問わず）に一度だけ閉じられる
    pub async fn run(self) -> PipelineResult<PipelineOutput<T>> {
        let capacity = validate_capacity(self.stream_capacity)?;
        let started_at = chrono::Utc::now();
        let start_time = Instant::now();

        self.reporter.report_started(self.stage_names.len()).await;

        let mut wiring = Wiring {
            capacity,
            reporter: Arc::clone(&self.reporter),
            tasks: Vec::with_capacity(self.stage_names.len()),
        };
        let (output_tx, output_rx) = stream(capacity);
        (self.wire)(output_tx, &mut wiring);

        // 末尾ストリームは並行して読み出す（容量が小さいため）
        let collector_handle = spawn_output_collector(output_rx);

        let handles: Vec<_> = wiring
            .tasks
            .into_iter()
            .map(|task| {
                let handle = tokio::spawn(task.body);
                (task.name, task.kind, handle)
            })
            .collect();

        let mut stages = Vec::with_capacity(handles.len());
        for (name, kind, handle) in handles {
            match handle.await {
                Ok(report) => stages.push(report),
                Err(error) => {
                    let error = PipelineError::stage(name.clone(), error.to_string());
                    tracing::error!(
                        stage = %name,
                        severity = error.severity().as_str(),
                        %error,
                        "ステージ本体が異常終了しました"
                    );
                    let mut report = StageReport::new(name, kind);
                    report.aborted = true;
                    stages.push(report);
                }
            }
        }

        let items = collector_handle.await.map_err(PipelineError::task)?;

        let summary = PipelineSummary {
            started_at,
            stages,
            total_time_ms: start_time.elapsed().as_millis() as u64,
        };
        self.reporter.report_completed(&summary).await;

        Ok(PipelineOutput { items, summary })
    }
}

/// ソースステージ: シードを順に送信する
async fn run_source<T>(seeds: Vec<T>, output: StreamSender<T>, ctx: StageContext) -> StageReport
where
    T: Send + 'static,
{
    ctx.started().await;
    for seed in seeds {
        ctx.received();
        if !ctx.emit(&output, seed).await {
            break;
        }
    }
    ctx.finish(Default::default()).await
}
