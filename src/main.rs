use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stage_pipeline::cli::{
    execute_hash, execute_spam, Cli, Commands, HashOptions, SpamOptions,
};
use stage_pipeline::PipelineError;

fn main() -> Result<()> {
    // ログはstderrへ（stdoutは結果出力用）
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let worker_threads = cli.worker_threads();
    tracing::debug!(worker_threads, json = cli.json, "起動");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;
    let result = runtime.block_on(dispatch(cli));

    // 構築時エラーには対処方法を添える
    if let Err(error) = &result {
        if let Some(pipeline_error) = error.downcast_ref::<PipelineError>() {
            let context = pipeline_error.context();
            tracing::error!(
                operation = %context.operation,
                severity = pipeline_error.severity().as_str(),
                recoverable = pipeline_error.is_recoverable(),
                "パイプラインを実行できませんでした"
            );
            if let Some(suggestion) = context.suggestion {
                eprintln!("ヒント: {suggestion}");
            }
        }
    }

    result
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Hash {
            seeds,
            width,
            gate_capacity,
            config,
        } => {
            let options = HashOptions {
                seeds,
                width,
                gate_capacity,
                config,
            };
            execute_hash(options, cli.json).await
        }
        Commands::Spam {
            mailbox,
            emails,
            config,
        } => {
            let options = SpamOptions {
                mailbox,
                emails,
                config,
            };
            execute_spam(options, cli.json).await
        }
    }
}
