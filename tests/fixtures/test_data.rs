// テストデータ生成
use stage_pipeline::services::{InMemoryMailbox, MailboxFixture, MailboxUser};
use std::collections::HashSet;

/// `count`人のユーザーを持つメールボックス
///
/// ユーザーiはID i+1、メッセージ 10(i+1) と 10(i+1)+1 を持ち、奇数IDのメッセージがスパム。
/// 各ユーザーには`alias-i@mail.example`という別名がある
pub fn sample_mailbox(count: u64, max_batch_size: usize, max_concurrent_checks: usize) -> InMemoryMailbox {
    let users: Vec<MailboxUser> = (0..count)
        .map(|i| {
            let id = i + 1;
            MailboxUser {
                id,
                email: user_email(i),
                aliases: vec![alias_email(i)],
                messages: vec![id * 10, id * 10 + 1],
            }
        })
        .collect();
    let spam: HashSet<u64> = users
        .iter()
        .flat_map(|user| user.messages.iter().copied())
        .filter(|id| id % 2 == 1)
        .collect();

    InMemoryMailbox::from_fixture(MailboxFixture {
        users,
        spam,
        failing_checks: HashSet::new(),
        max_batch_size,
        max_concurrent_checks,
        latency_ms: 0,
    })
    .expect("fixture must be valid")
}

pub fn user_email(index: u64) -> String {
    format!("user-{index}@mail.example")
}

pub fn alias_email(index: u64) -> String {
    format!("alias-{index}@mail.example")
}

pub fn seeds(count: usize) -> Vec<String> {
    (0..count).map(|n| n.to_string()).collect()
}
