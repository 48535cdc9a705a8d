// スパム判定パイプラインのエンドツーエンドテスト
use crate::fixtures::{alias_email, sample_mailbox, user_email};
use stage_pipeline::core::traits::MockPipelineReporter;
use stage_pipeline::pipelines::{spam, SpamServices};
use stage_pipeline::services::{DefaultEngineConfig, InMemoryMailbox};
use stage_pipeline::MsgData;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spam_pipeline_respects_service_limits() {
    let mailbox = Arc::new(sample_mailbox(10, 3, 4).with_latency(Duration::from_millis(2)));
    let services = SpamServices::shared(Arc::clone(&mailbox));
    let config = DefaultEngineConfig::default()
        .with_batch_size(3)
        .with_max_in_flight_checks(4);

    // 全ユーザーを本名・別名・重複で投入
    let mut emails: Vec<String> = (0..10).map(user_email).collect();
    emails.extend((0..10).map(alias_email));
    emails.extend((0..5).map(user_email));

    let output = spam::build(emails, &services, &config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(output.items.len(), 20);
    assert_eq!(output.summary.stage("SelectUsers").unwrap().dropped, 15);
    assert_eq!(output.summary.total_failed(), 0);

    let mut expected = output.items.clone();
    expected.sort_by(spam::spam_first);
    assert_eq!(output.items, expected);
    assert!(output.items[..10].iter().all(|record| record.has_spam));
    assert!(output.items[10..].iter().all(|record| !record.has_spam));

    let batches = mailbox.batch_sizes();
    assert_eq!(batches.iter().sum::<usize>(), 10);
    assert_eq!(batches.len(), 4);
    assert!(batches.iter().all(|&size| size <= 3));
    assert!(mailbox.peak_concurrent_checks() <= 4);
}

#[tokio::test]
async fn test_failed_checks_are_reported_and_dropped() {
    let mut fixture = tempfile::NamedTempFile::new().unwrap();
    write!(
        fixture,
        r#"{{
            "users": [{{"id": 1, "email": "erin@mail.example", "messages": [1, 2, 3, 4]}}],
            "spam": [2],
            "failing_checks": [3, 4]
        }}"#
    )
    .unwrap();
    let mailbox = InMemoryMailbox::from_json_file(fixture.path()).unwrap();
    let services = SpamServices::shared(Arc::new(mailbox));

    let mut reporter = MockPipelineReporter::new();
    reporter.expect_report_started().times(1).returning(|_| ());
    reporter.expect_report_stage_started().times(5).returning(|_, _| ());
    reporter
        .expect_report_item_failed()
        .withf(|stage, _| stage == "CheckSpam")
        .times(2)
        .returning(|_, _| ());
    reporter.expect_report_stage_completed().times(5).returning(|_| ());
    reporter.expect_report_completed().times(1).returning(|_| ());

    let output = spam::build(
        vec!["erin@mail.example".to_string()],
        &services,
        &DefaultEngineConfig::default(),
    )
    .unwrap()
    .with_reporter(Arc::new(reporter))
    .run()
    .await
    .unwrap();

    assert_eq!(
        output.items,
        vec![
            MsgData { id: 2, has_spam: true },
            MsgData { id: 1, has_spam: false },
        ]
    );
    assert_eq!(output.summary.stage("CheckSpam").unwrap().failed, 2);
}

#[tokio::test]
async fn test_empty_email_list_completes() {
    let services = SpamServices::shared(Arc::new(sample_mailbox(2, 2, 2)));

    let output = spam::build(Vec::new(), &services, &DefaultEngineConfig::default())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(output.items.is_empty());
    assert_eq!(output.summary.stages.len(), 5);
}
