// インメモリのメールボックス
// ユーザー解決・メッセージ取得・スパム判定の3サービスをフィクスチャから提供する

use crate::core::{
    IdentityLookup, MessageStore, MsgId, PipelineError, PipelineResult, SpamChecker, User,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

fn default_max_batch_size() -> usize {
    2
}

fn default_max_concurrent_checks() -> usize {
    5
}

/// フィクスチャ上のユーザー（別名のメールアドレスも同じIDに解決される）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxUser {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub messages: Vec<MsgId>,
}

/// JSONフィクスチャの形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxFixture {
    pub users: Vec<MailboxUser>,
    #[serde(default)]
    pub spam: HashSet<MsgId>,
    /// 判定時に必ず失敗するメッセージID
    #[serde(default)]
    pub failing_checks: HashSet<MsgId>,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
    /// 各呼び出しの擬似レイテンシ（ミリ秒）
    #[serde(default)]
    pub latency_ms: u64,
}

#[derive(Debug, Default)]
struct MailboxStats {
    resolve_calls: AtomicUsize,
    active_checks: AtomicUsize,
    peak_checks: AtomicUsize,
    batches: Mutex<Vec<usize>>,
}

/// 同時実行中のチェック数を数えるガード
struct ActiveCheck<'a> {
    active: &'a AtomicUsize,
}

impl Drop for ActiveCheck<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct InMemoryMailbox {
    users_by_key: HashMap<String, User>,
    messages: HashMap<u64, Vec<MsgId>>,
    spam: HashSet<MsgId>,
    failing_checks: HashSet<MsgId>,
    max_batch_size: usize,
    max_concurrent_checks: usize,
    latency: Duration,
    stats: Arc<MailboxStats>,
}

impl InMemoryMailbox {
    pub fn from_fixture(fixture: MailboxFixture) -> PipelineResult<Self> {
        if fixture.max_batch_size == 0 {
            return Err(PipelineError::validation("max_batch_size", "1以上である必要があります"));
        }
        if fixture.max_concurrent_checks == 0 {
            return Err(PipelineError::validation(
                "max_concurrent_checks",
                "1以上である必要があります",
            ));
        }

        let mut users_by_key = HashMap::new();
        let mut messages = HashMap::new();
        for entry in fixture.users {
            let user = User {
                id: entry.id,
                email: entry.email.clone(),
            };
            for key in std::iter::once(entry.email).chain(entry.aliases) {
                users_by_key.insert(key, user.clone());
            }
            messages
                .entry(entry.id)
                .or_insert_with(Vec::new)
                .extend(entry.messages);
        }

        Ok(Self {
            users_by_key,
            messages,
            spam: fixture.spam,
            failing_checks: fixture.failing_checks,
            max_batch_size: fixture.max_batch_size,
            max_concurrent_checks: fixture.max_concurrent_checks,
            latency: Duration::from_millis(fixture.latency_ms),
            stats: Arc::new(MailboxStats::default()),
        })
    }

    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let fixture: MailboxFixture = serde_json::from_str(json)
            .map_err(|e| PipelineError::configuration(format!("フィクスチャ解析エラー: {e}")))?;
        Self::from_fixture(fixture)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(format!(
                "フィクスチャを読み込めません: {} ({e})",
                path.display()
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.stats.resolve_calls.load(Ordering::SeqCst)
    }

    /// `check`の同時実行数の最大値
    pub fn peak_concurrent_checks(&self) -> usize {
        self.stats.peak_checks.load(Ordering::SeqCst)
    }

    /// `lookup_batch`に渡されたバッチのサイズ（呼び出し順）
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.stats
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl IdentityLookup for InMemoryMailbox {
    async fn resolve(&self, key: &str) -> Result<User> {
        self.stats.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        self.users_by_key
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("unknown user: {key}"))
    }
}

#[async_trait]
impl MessageStore for InMemoryMailbox {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn lookup_batch(&self, users: &[User]) -> Result<Vec<MsgId>> {
        if users.len() > self.max_batch_size {
            bail!(
                "batch too large: {} users (max {})",
                users.len(),
                self.max_batch_size
            );
        }
        self.stats
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(users.len());
        self.simulate_latency().await;

        Ok(users
            .iter()
            .flat_map(|user| self.messages.get(&user.id).into_iter().flatten().copied())
            .collect())
    }
}

#[async_trait]
impl SpamChecker for InMemoryMailbox {
    fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_checks
    }

    async fn check(&self, id: MsgId) -> Result<bool> {
        let active = self.stats.active_checks.fetch_add(1, Ordering::SeqCst) + 1;
        let _check = ActiveCheck {
            active: &self.stats.active_checks,
        };
        self.stats.peak_checks.fetch_max(active, Ordering::SeqCst);

        if active > self.max_concurrent_checks {
            bail!(
                "too many concurrent checks: {active} (max {})",
                self.max_concurrent_checks
            );
        }

        self.simulate_latency().await;

        if self.failing_checks.contains(&id) {
            bail!("check failed for message {id}");
        }
        Ok(self.spam.contains(&id))
    }
}
