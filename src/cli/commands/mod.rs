pub mod hash;
pub mod spam;

pub use hash::*;
pub use spam::*;

use crate::core::PipelineSummary;
use crate::services::DefaultEngineConfig;
use anyhow::Result;
use std::path::Path;

/// 設定ファイルがあれば読み込み、なければデフォルト設定を使う
pub fn load_config(path: Option<&Path>) -> Result<DefaultEngineConfig> {
    match path {
        Some(path) => Ok(DefaultEngineConfig::from_json_file(path)?),
        None => Ok(DefaultEngineConfig::default()),
    }
}

/// サマリーをJSONで出力
pub fn print_summary_json(summary: &PipelineSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
