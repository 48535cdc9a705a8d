// 同時実行数の計測
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 区間に入っているタスク数と、その最大値を記録する
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

pub struct GaugeGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> GaugeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        GaugeGuard {
            current: Arc::clone(&self.current),
        }
    }

    /// 区間内で`delay`だけ待機する
    pub async fn hold(&self, delay: Duration) {
        let _guard = self.enter();
        tokio::time::sleep(delay).await;
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}
