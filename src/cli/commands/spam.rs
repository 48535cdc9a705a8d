use super::{load_config, print_summary_json};
use crate::core::{MsgData, PipelineOutput, PipelineReporter};
use crate::pipelines::{spam, SpamServices};
use crate::services::{InMemoryMailbox, TracingReporter};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Options for the spam command
pub struct SpamOptions {
    pub mailbox: PathBuf,
    pub emails: Vec<String>,
    pub config: Option<PathBuf>,
}

/// Build and run the spam pipeline against a mailbox fixture
pub async fn run_spam(
    options: SpamOptions,
    reporter: Arc<dyn PipelineReporter>,
) -> Result<PipelineOutput<MsgData>> {
    let config = load_config(options.config.as_deref())?;
    let mailbox = InMemoryMailbox::from_json_file(&options.mailbox)?;
    let services = SpamServices::shared(Arc::new(mailbox));

    let output = spam::build(options.emails, &services, &config)?
        .with_reporter(reporter)
        .run()
        .await?;
    Ok(output)
}

/// Execute the spam command
pub async fn execute_spam(options: SpamOptions, json: bool) -> Result<()> {
    let output = run_spam(options, Arc::new(TracingReporter::new())).await?;

    for record in &output.items {
        println!("{record}");
    }
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
