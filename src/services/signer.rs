// ダイジェスト計算サービス
// digest_a: SHA-256先頭4バイトの10進表現、digest_b: MD5の16進表現

use crate::core::Signer;
use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct DigestCounters {
    calls_a: AtomicUsize,
    calls_b: AtomicUsize,
    active_b: AtomicUsize,
    peak_b: AtomicUsize,
}

/// 実行中の`digest_b`呼び出しを数えるガード
struct ActiveCall<'a> {
    active: &'a AtomicUsize,
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 遅延と同時実行上限を模擬する`Signer`実装
///
/// `digest_b`は`digest_b_limit`を超えて同時に呼ばれると過熱エラーを返す。
/// クローンは同じカウンターを共有する
#[derive(Debug, Clone)]
pub struct DigestSigner {
    latency_a: Duration,
    latency_b: Duration,
    digest_b_limit: usize,
    counters: Arc<DigestCounters>,
}

impl DigestSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 各プリミティブの擬似レイテンシを設定
    pub fn with_latency(mut self, digest_a: Duration, digest_b: Duration) -> Self {
        self.latency_a = digest_a;
        self.latency_b = digest_b;
        self
    }

    pub fn with_digest_b_limit(mut self, limit: usize) -> Self {
        self.digest_b_limit = limit;
        self
    }

    pub fn digest_a_calls(&self) -> usize {
        self.counters.calls_a.load(Ordering::SeqCst)
    }

    pub fn digest_b_calls(&self) -> usize {
        self.counters.calls_b.load(Ordering::SeqCst)
    }

    /// `digest_b`の同時実行数の最大値
    pub fn peak_concurrent_digest_b(&self) -> usize {
        self.counters.peak_b.load(Ordering::SeqCst)
    }

    fn compute_a(input: &str) -> String {
        let hash = Sha256::digest(input.as_bytes());
        let prefix = [hash[0], hash[1], hash[2], hash[3]];
        u32::from_be_bytes(prefix).to_string()
    }

    fn compute_b(input: &str) -> String {
        hex::encode(md5::compute(input.as_bytes()).0)
    }
}

impl Default for DigestSigner {
    fn default() -> Self {
        Self {
            latency_a: Duration::ZERO,
            latency_b: Duration::ZERO,
            digest_b_limit: 1,
            counters: Arc::new(DigestCounters::default()),
        }
    }
}

#[async_trait]
impl Signer for DigestSigner {
    async fn digest_a(&self, input: &str) -> Result<String> {
        self.counters.calls_a.fetch_add(1, Ordering::SeqCst);
        if !self.latency_a.is_zero() {
            tokio::time::sleep(self.latency_a).await;
        }
        Ok(Self::compute_a(input))
    }

    async fn digest_b(&self, input: &str) -> Result<String> {
        self.counters.calls_b.fetch_add(1, Ordering::SeqCst);

        let active = self.counters.active_b.fetch_add(1, Ordering::SeqCst) + 1;
        let _call = ActiveCall {
            active: &self.counters.active_b,
        };
        self.counters.peak_b.fetch_max(active, Ordering::SeqCst);

        if active > self.digest_b_limit {
            bail!(
                "digest_b overheat: {active} concurrent calls (limit {})",
                self.digest_b_limit
            );
        }

        if !self.latency_b.is_zero() {
            tokio::time::sleep(self.latency_b).await;
        }
        Ok(Self::compute_b(input))
    }
}
