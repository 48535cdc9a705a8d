use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stage_pipeline")]
#[command(about = "Run multi-stage concurrent stream pipelines")]
#[command(version)]
pub struct Cli {
    /// Print the pipeline summary as JSON after the result
    #[arg(long, global = true)]
    pub json: bool,

    /// Number of runtime worker threads (defaults to the CPU count)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// ランタイムのワーカー数（0指定は1に切り上げる）
    pub fn worker_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive a combined signature from seed values
    Hash {
        /// Seed values fed to the source stage in order
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Width of the indexed fan-out stage
        #[arg(short, long)]
        width: Option<usize>,

        /// Maximum concurrent calls to the rate-gated digest
        #[arg(short, long)]
        gate_capacity: Option<usize>,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Classify the messages of the given users as spam or not
    Spam {
        /// Mailbox fixture file (JSON)
        #[arg(short, long)]
        mailbox: PathBuf,

        /// User email addresses (aliases are deduplicated)
        #[arg(required = true)]
        emails: Vec<String>,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
