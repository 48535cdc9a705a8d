// エンジン層 - ステージ間ストリームと並行処理方式
// ステージを独立タスクとして起動し、ストリームのクローズで終了を伝播する

pub mod barrier;
mod collector;
pub mod context;
pub mod disciplines;
pub mod executor;
pub mod gate;
pub mod stage;
pub mod stream;

// 公開API
pub use barrier::{JoinBarrier, JoinOutcome};
pub use context::StageContext;
pub use disciplines::{Batch, Combine, Dedup, DedupSet, FanOut, Indexed, RateGated};
pub use executor::Pipeline;
pub use gate::{GatePermit, PermitGate};
pub use stage::{Discipline, Stage};
pub use stream::{stream, StreamReceiver, StreamSender, DEFAULT_STREAM_CAPACITY};
