// ハッシュ導出パイプラインのエンドツーエンドテスト
use crate::fixtures::seeds;
use stage_pipeline::pipelines::hash;
use stage_pipeline::services::{DefaultEngineConfig, DigestSigner, TracingReporter};
use stage_pipeline::PermitGate;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_signature_is_deterministic_across_runs() {
    let config = DefaultEngineConfig::default();
    let mut signatures = Vec::new();

    for _ in 0..3 {
        let signer = DigestSigner::new().with_latency(Duration::from_millis(1), Duration::from_millis(3));
        let output = hash::build(seeds(5), Arc::new(signer), &config)
            .unwrap()
            .with_reporter(Arc::new(TracingReporter::quiet()))
            .run()
            .await
            .unwrap();
        assert_eq!(output.items.len(), 1);
        signatures.push(output.items[0].clone());
    }

    assert!(signatures.windows(2).all(|pair| pair[0] == pair[1]));
    // 5件の結果が区切り文字で結合されている
    assert_eq!(signatures[0].split('_').count(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_gate_limits_concurrent_pipelines() {
    let gate = PermitGate::new(hash::DIGEST_B_GATE, 1).unwrap();
    let signer = DigestSigner::new()
        .with_latency(Duration::ZERO, Duration::from_millis(5))
        .with_digest_b_limit(1);
    let config = DefaultEngineConfig::default().with_fan_out_width(2);

    let first = hash::build_with_gate(seeds(6), Arc::new(signer.clone()), gate.clone(), &config)
        .unwrap();
    let second = hash::build_with_gate(seeds(6), Arc::new(signer.clone()), gate, &config)
        .unwrap();

    let (first, second) = tokio::join!(first.run(), second.run());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.items, second.items);
    assert_eq!(first.summary.total_failed() + second.summary.total_failed(), 0);
    assert_eq!(signer.digest_b_calls(), 12);
    assert_eq!(signer.peak_concurrent_digest_b(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wider_gate_overheats_narrow_service() {
    // ゲートをサービスの上限より広げると、外部サービス側で失敗が観測される
    let signer = DigestSigner::new()
        .with_latency(Duration::ZERO, Duration::from_millis(20))
        .with_digest_b_limit(1);
    let config = DefaultEngineConfig::default().with_rate_gate_capacity(4);

    let output = hash::build(seeds(8), Arc::new(signer.clone()), &config)
        .unwrap()
        .run()
        .await
        .unwrap();

    let single_hash = output.summary.stage("SingleHash").unwrap();
    assert!(single_hash.failed > 0);
    assert!(signer.peak_concurrent_digest_b() > 1);
    assert!(signer.peak_concurrent_digest_b() <= 4);
}
