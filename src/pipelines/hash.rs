// ハッシュ導出パイプライン
// Source -> SingleHash(レート制限) -> MultiHash(インデックス付き) -> CombineResults(ソート結合)

use crate::core::{EngineConfig, PipelineResult, Signer};
use crate::engine::{Combine, Indexed, PermitGate, Pipeline, RateGated, Stage};
use std::sync::Arc;

/// `digest_b`用のゲート名
pub const DIGEST_B_GATE: &str = "digest_b";

/// 設定の`rate_gate_capacity`で新しいゲートを作成してパイプラインを構築
pub fn build<C>(
    seeds: Vec<String>,
    signer: Arc<dyn Signer>,
    config: &C,
) -> PipelineResult<Pipeline<String>>
where
    C: EngineConfig + ?Sized,
{
    let gate = PermitGate::new(DIGEST_B_GATE, config.rate_gate_capacity())?;
    build_with_gate(seeds, signer, gate, config)
}

/// 既存の`digest_b`ゲートを共有してパイプラインを構築
///
/// 同じゲートを複数のパイプラインに渡すと、その全体で同時実行数が制限される
pub fn build_with_gate<C>(
    seeds: Vec<String>,
    signer: Arc<dyn Signer>,
    gate: PermitGate,
    config: &C,
) -> PipelineResult<Pipeline<String>>
where
    C: EngineConfig + ?Sized,
{
    let single_hash = single_hash(Arc::clone(&signer), gate);
    let multi_hash = multi_hash(signer, config.fan_out_width())?;

    Ok(Pipeline::from_seeds("Source", seeds)
        .then(Stage::new("SingleHash", single_hash))
        .then(Stage::new("MultiHash", multi_hash))
        .then(Stage::new(
            "CombineResults",
            Combine::join_sorted(config.join_separator()),
        ))
        .with_stream_capacity(config.stream_capacity()))
}

/// `digest_a(s) ~ digest_a(digest_b(s))`
///
/// 2つの枝は並行に実行され、`digest_b`の呼び出しだけがゲートで制限される
fn single_hash(signer: Arc<dyn Signer>, gate: PermitGate) -> RateGated<String, String> {
    RateGated::new(gate, move |seed: String, gate: PermitGate| {
        let signer = Arc::clone(&signer);
        async move {
            let plain = signer.digest_a(&seed);
            let gated = async {
                // 外側はゲート自体のエラー、内側はdigest_bのエラー
                let digest_b = gate.run(signer.digest_b(&seed)).await??;
                signer.digest_a(&digest_b).await
            };
            let (plain, gated) = tokio::try_join!(plain, gated)?;

            let result = format!("{plain}~{gated}");
            tracing::debug!(seed = %seed, result = %result, "SingleHash");
            Ok(vec![result])
        }
    })
}

/// `digest_a(i + s)`をi = 0..W-1について並行に計算し、インデックス順に連結
fn multi_hash(signer: Arc<dyn Signer>, width: usize) -> PipelineResult<Indexed<String, String>> {
    Indexed::concat(width, move |index, single: Arc<String>| {
        let signer = Arc::clone(&signer);
        async move { signer.digest_a(&format!("{index}{single}")).await }
    })
}
