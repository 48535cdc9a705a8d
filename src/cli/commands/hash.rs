use super::{load_config, print_summary_json};
use crate::core::{EngineConfig, PipelineError, PipelineOutput, PipelineReporter};
use crate::pipelines::hash;
use crate::services::{DigestSigner, TracingReporter};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Options for the hash command
pub struct HashOptions {
    pub seeds: Vec<String>,
    pub width: Option<usize>,
    pub gate_capacity: Option<usize>,
    pub config: Option<PathBuf>,
}

/// Build and run the hash pipeline, returning the combined signature
pub async fn run_hash(
    options: HashOptions,
    reporter: Arc<dyn PipelineReporter>,
) -> Result<PipelineOutput<String>> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(width) = options.width {
        config = config.with_fan_out_width(width);
    }
    if let Some(capacity) = options.gate_capacity {
        config = config.with_rate_gate_capacity(capacity);
    }
    config.validate()?;

    // 外部サービス側の上限はゲート容量に合わせる
    let signer = DigestSigner::new().with_digest_b_limit(config.rate_gate_capacity());

    let output = hash::build(options.seeds, Arc::new(signer), &config)?
        .with_reporter(reporter)
        .run()
        .await?;
    Ok(output)
}

/// Execute the hash command
pub async fn execute_hash(options: HashOptions, json: bool) -> Result<()> {
    let output = run_hash(options, Arc::new(TracingReporter::new())).await?;

    // 結合ステージが異常終了した場合のみ結果が欠ける
    let signature = output.items.first().ok_or_else(|| {
        PipelineError::stage("CombineResults", "結合結果が出力されませんでした")
    })?;
    println!("{signature}");
    if output.summary.total_failed() > 0 {
        eprintln!(
            "⚠️  {}個のアイテムが処理中に破棄されました",
            output.summary.total_failed()
        );
    }
    if json {
        print_summary_json(&output.summary)?;
    }

    Ok(())
}
