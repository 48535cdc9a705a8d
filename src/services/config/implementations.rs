// 設定管理の具象実装

use crate::core::{EngineConfig, PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// デフォルト設定実装
///
/// JSONで省略したフィールドは`Default`の値で補われる
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultEngineConfig {
    stream_capacity: usize,
    fan_out_width: usize,
    rate_gate_capacity: usize,
    batch_size: usize,
    max_in_flight_checks: usize,
    join_separator: String,
}

impl DefaultEngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    pub fn with_fan_out_width(mut self, width: usize) -> Self {
        self.fan_out_width = width;
        self
    }

    pub fn with_rate_gate_capacity(mut self, capacity: usize) -> Self {
        self.rate_gate_capacity = capacity;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_in_flight_checks(mut self, limit: usize) -> Self {
        self.max_in_flight_checks = limit;
        self
    }

    pub fn with_join_separator(mut self, separator: impl Into<String>) -> Self {
        self.join_separator = separator.into();
        self
    }

    /// JSON文字列から読み込み、検証済みの設定を返す
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PipelineError::configuration(format!("JSON解析エラー: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// JSONファイルから読み込む
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(format!(
                "設定ファイルを読み込めません: {} ({e})",
                path.display()
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// 実行前の検証（0の容量や空の区切り文字を拒否）
    pub fn validate(&self) -> PipelineResult<()> {
        let positive = [
            ("stream_capacity", self.stream_capacity),
            ("fan_out_width", self.fan_out_width),
            ("rate_gate_capacity", self.rate_gate_capacity),
            ("batch_size", self.batch_size),
            ("max_in_flight_checks", self.max_in_flight_checks),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(PipelineError::validation(field, "1以上である必要があります"));
            }
        }

        if self.join_separator.is_empty() {
            return Err(PipelineError::validation(
                "join_separator",
                "空文字列は指定できません",
            ));
        }

        Ok(())
    }
}

impl Default for DefaultEngineConfig {
    fn default() -> Self {
        Self {
            stream_capacity: 1,
            fan_out_width: 6,
            rate_gate_capacity: 1,
            batch_size: 2,
            max_in_flight_checks: 5,
            join_separator: "_".to_string(),
        }
    }
}

impl EngineConfig for DefaultEngineConfig {
    fn stream_capacity(&self) -> usize {
        self.stream_capacity
    }

    fn fan_out_width(&self) -> usize {
        self.fan_out_width
    }

    fn rate_gate_capacity(&self) -> usize {
        self.rate_gate_capacity
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn max_in_flight_checks(&self) -> usize {
        self.max_in_flight_checks
    }

    fn join_separator(&self) -> String {
        self.join_separator.clone()
    }
}
