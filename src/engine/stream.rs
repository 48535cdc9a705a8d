// Stream - ステージ間の単方向チャンネル
// 上流ステージが唯一の送信者（クローズ責任者）、下流ステージが唯一の受信者

use crate::core::{PipelineError, PipelineResult};
use tokio::sync::mpsc;

/// ストリームの既定容量
///
/// tokioのmpscは容量0を持てないため、1を「ほぼバッファなし」として扱う
pub const DEFAULT_STREAM_CAPACITY: usize = 1;

pub type StreamSender<T> = mpsc::Sender<T>;
pub type StreamReceiver<T> = mpsc::Receiver<T>;

/// ストリームを作成
///
/// 全ての送信側がドロップされた時点でストリームはクローズされる
pub fn stream<T>(capacity: usize) -> (StreamSender<T>, StreamReceiver<T>) {
    mpsc::channel(capacity.max(1))
}

/// ストリーム容量を検証
pub fn validate_capacity(capacity: usize) -> PipelineResult<usize> {
    if capacity == 0 {
        return Err(PipelineError::validation(
            "stream_capacity",
            "ストリーム容量は1以上である必要があります",
        ));
    }
    Ok(capacity)
}

/// 下流へ送信し、下流が既に終了していれば`false`を返す
///
/// 下流の終了はこのステージの失敗ではないため、呼び出し側は入力の消費を続ける
pub async fn emit<T>(output: &StreamSender<T>, item: T) -> bool {
    if output.send(item).await.is_err() {
        tracing::debug!("下流ストリームが既に閉じられています");
        return false;
    }
    true
}
