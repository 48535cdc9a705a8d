// Output Collector - 末尾ストリームの収集

use super::stream::StreamReceiver;
use tokio::task::JoinHandle;

/// 末尾ステージの出力ストリームを閉じられるまで読み出し、到着順に返す
pub fn spawn_output_collector<T>(mut output_rx: StreamReceiver<T>) -> JoinHandle<Vec<T>>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        let mut items = Vec::new();
        while let Some(item) = output_rx.recv().await {
            items.push(item);
        }
        tracing::debug!(count = items.len(), "出力ストリームの収集完了");
        items
    })
}
