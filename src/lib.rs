// 多段並行ストリーム処理エンジン
//
// core: トレイト・型・エラー / engine: ストリーム・ゲート・並行処理方式・実行器
// services: 具象実装 / pipelines: ハッシュ導出とスパム判定 / cli: コマンドライン

pub mod cli;
pub mod core;
pub mod engine;
pub mod pipelines;
pub mod services;

pub use crate::core::{
    EngineConfig, MsgData, MsgId, PipelineError, PipelineOutput, PipelineReporter,
    PipelineResult, PipelineSummary, StageReport, User,
};
pub use crate::engine::{
    Batch, Combine, Dedup, DedupSet, Discipline, FanOut, Indexed, PermitGate, Pipeline,
    RateGated, Stage,
};
pub use crate::services::{DefaultEngineConfig, NoOpReporter, TracingReporter};
