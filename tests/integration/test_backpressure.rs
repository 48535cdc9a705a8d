// 低速なシンクに対する背圧の検証
use crate::fixtures::ConcurrencyGauge;
use stage_pipeline::{FanOut, Pipeline, PipelineOutput, Stage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const UPSTREAM_CAP: usize = 3;

/// source -> upstream(上限付き) -> slow_sink(1件ずつ低速に処理)
async fn run_with_slow_sink(count: u64, gauge: ConcurrencyGauge) -> PipelineOutput<u64> {
    let upstream = FanOut::map(move |n: u64| {
        let gauge = gauge.clone();
        async move {
            let _guard = gauge.enter();
            Ok(n * 2)
        }
    })
    .with_max_in_flight(UPSTREAM_CAP)
    .unwrap();

    let slow_sink = FanOut::map(|n: u64| async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(n)
    })
    .with_max_in_flight(1)
    .unwrap();

    Pipeline::from_seeds("source", (0..count).collect::<Vec<u64>>())
        .then(Stage::new("upstream", upstream))
        .then(Stage::new("slow_sink", slow_sink))
        .run()
        .await
        .unwrap()
}

/// 上流が処理を始めた件数と、シンクが受け取った件数の差の最大値
#[derive(Debug, Clone, Default)]
struct Lead {
    produced: Arc<AtomicUsize>,
    consumed: Arc<AtomicUsize>,
    max_gap: Arc<AtomicUsize>,
}

impl Lead {
    fn max_gap(&self) -> usize {
        self.max_gap.load(Ordering::SeqCst)
    }
}

/// source -> relay(即時に転送) -> slow_sink、ストリーム容量を指定して実行する
async fn run_with_lead(count: u64, stream_capacity: usize, lead: Lead) -> PipelineOutput<u64> {
    let relay_lead = lead.clone();
    let relay = FanOut::map(move |n: u64| {
        relay_lead.produced.fetch_add(1, Ordering::SeqCst);
        async move { Ok(n) }
    })
    .with_max_in_flight(1)
    .unwrap();

    let slow_sink = FanOut::map(move |n: u64| {
        let consumed = lead.consumed.fetch_add(1, Ordering::SeqCst) + 1;
        let produced = lead.produced.load(Ordering::SeqCst);
        lead.max_gap
            .fetch_max(produced.saturating_sub(consumed), Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(n)
        }
    })
    .with_max_in_flight(1)
    .unwrap();

    Pipeline::from_seeds("source", (0..count).collect::<Vec<u64>>())
        .with_stream_capacity(stream_capacity)
        .then(Stage::new("relay", relay))
        .then(Stage::new("slow_sink", slow_sink))
        .run()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_sink_bounds_upstream_in_flight_tasks() {
    let gauge = ConcurrencyGauge::new();
    let output = run_with_slow_sink(100, gauge.clone()).await;

    assert_eq!(output.items.len(), 100);
    let upstream = output.summary.stage("upstream").unwrap();
    assert!(upstream.peak_in_flight <= UPSTREAM_CAP);
    assert!(gauge.peak() <= UPSTREAM_CAP);

    let sink = output.summary.stage("slow_sink").unwrap();
    assert_eq!(sink.peak_in_flight, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unit_streams_keep_relay_close_to_slow_sink() {
    // 容量1のストリームでは、上流はシンクの数件先までしか進めない
    let lead = Lead::default();
    let output = run_with_lead(100, 1, lead.clone()).await;

    assert_eq!(output.items.len(), 100);
    assert_eq!(output.summary.stage("slow_sink").unwrap().peak_in_flight, 1);
    // 転送中1件 + ストリーム内1件 + シンクの受信待ち1件
    assert!(lead.max_gap() <= 4, "max gap was {}", lead.max_gap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_large_streams_let_relay_run_ahead() {
    // 容量を大きくすると上流はシンクを待たずに先行する
    let lead = Lead::default();
    let output = run_with_lead(200, 10_000, lead.clone()).await;

    assert_eq!(output.items.len(), 200);
    assert!(lead.max_gap() > 50, "max gap was {}", lead.max_gap());
}
