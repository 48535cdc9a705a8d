// 任意の並行処理方式の組み合わせが有限時間で終了することを検証
use proptest::prelude::*;
use stage_pipeline::{
    Batch, Combine, Dedup, FanOut, Indexed, PermitGate, Pipeline, RateGated, Stage,
};
use std::sync::Arc;
use std::time::Duration;

const BUDGET: Duration = Duration::from_secs(10);

/// (方式, パラメータ, 失敗させるかどうか)
#[derive(Debug, Clone, Copy)]
struct StagePlan {
    kind: u8,
    param: usize,
    flaky: bool,
}

fn stage_plan() -> impl Strategy<Value = StagePlan> {
    (0u8..6, 1usize..4, any::<bool>()).prop_map(|(kind, param, flaky)| StagePlan {
        kind,
        param,
        flaky,
    })
}

fn build_stage(index: usize, plan: StagePlan) -> Stage<u64, u64> {
    let name = format!("stage-{index}");
    let StagePlan { param, flaky, .. } = plan;
    let rejects = move |n: u64| flaky && n % 7 == 3;

    match plan.kind {
        0 => Stage::new(
            name,
            FanOut::map(move |n: u64| async move {
                if rejects(n) {
                    anyhow::bail!("fan-out rejected {n}");
                }
                tokio::time::sleep(Duration::from_micros(n % 5 * 100)).await;
                Ok(n + 1)
            }),
        ),
        1 => {
            let gate = PermitGate::new("liveness", param).unwrap();
            Stage::new(
                name,
                RateGated::new(gate, move |n: u64, gate: PermitGate| async move {
                    gate.run(tokio::task::yield_now()).await?;
                    if rejects(n) {
                        anyhow::bail!("gated call rejected {n}");
                    }
                    Ok(vec![n])
                }),
            )
        }
        2 => Stage::new(
            name,
            Indexed::new(
                param,
                move |index, n: Arc<u64>| async move {
                    if rejects(*n) {
                        anyhow::bail!("part {index} rejected");
                    }
                    Ok(*n % 3 + index as u64)
                },
                |n: &u64, parts: Vec<u64>| n + parts.iter().sum::<u64>(),
            )
            .unwrap(),
        ),
        3 => Stage::new(name, Dedup::new(|n: u64| async move { Ok((n % 16, n)) })),
        4 => Stage::new(
            name,
            Batch::new(param, move |batch: Vec<u64>| async move {
                if batch.iter().any(|&n| rejects(n)) {
                    anyhow::bail!("batch rejected");
                }
                Ok(batch)
            })
            .unwrap(),
        ),
        _ => Stage::new(name, Combine::each(|a: &u64, b: &u64| a.cmp(b), |n: u64| n)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_stage_combination_terminates(
        inputs in prop::collection::vec(0u64..50, 0..30),
        plans in prop::collection::vec(stage_plan(), 1..6),
        capacity in 1usize..4,
    ) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_time()
            .build()
            .unwrap();

        let source_len = inputs.len();
        let mut pipeline = Pipeline::from_seeds("source", inputs).with_stream_capacity(capacity);
        for (index, plan) in plans.iter().enumerate() {
            pipeline = pipeline.then(build_stage(index, *plan));
        }
        let stage_count = pipeline.stage_names().len();

        // タイマーはランタイム内で作成する
        let result = runtime.block_on(async { tokio::time::timeout(BUDGET, pipeline.run()).await });

        let output = match result {
            Ok(output) => output.unwrap(),
            Err(_) => return Err(TestCaseError::fail(format!("deadlock with {plans:?}"))),
        };
        prop_assert!(output.items.len() <= source_len);
        prop_assert_eq!(output.summary.stages.len(), stage_count);
        prop_assert!(output.summary.stages.iter().all(|stage| !stage.aborted));
    }
}
