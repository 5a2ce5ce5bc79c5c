// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::TestHarness;
use outbox_relay::domain::models::outbox_message::{OutboxMessage, OutboxStatus};
use outbox_relay::domain::repositories::outbox_repository::OutboxRepository;
use outbox_relay::infrastructure::repositories::outbox_repo_impl::OutboxRepositoryImpl;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

const TOTAL: usize = 120;

#[tokio::test]
async fn test_two_workers_drain_the_outbox_without_losses() {
    let harness = TestHarness::new().await;

    for i in 0..TOTAL {
        let message = OutboxMessage::new(
            format!("agg-{}", i % 10),
            "User".to_string(),
            "USER_INSERT".to_string(),
            format!(r#"{{"seq":{}}}"#, i),
            None,
            3,
        );
        OutboxRepositoryImpl::insert_on(harness.db.as_ref(), &message)
            .await
            .unwrap();
    }

    let worker_a = harness.relay_worker("worker-a");
    let worker_b = harness.relay_worker("worker-b");
    let cancel = CancellationToken::new();

    // Alternate poll passes until the table is drained
    for _ in 0..20 {
        worker_a.process_pending_messages(&cancel).await.unwrap();
        worker_b.process_pending_messages(&cancel).await.unwrap();

        let pending = harness
            .repository
            .count_by_status(OutboxStatus::Pending)
            .await
            .unwrap();
        if pending == 0 {
            break;
        }
    }

    assert_eq!(
        harness
            .repository
            .count_by_status(OutboxStatus::Sent)
            .await
            .unwrap(),
        TOTAL as u64
    );
    assert_eq!(
        harness
            .repository
            .count_by_status(OutboxStatus::Failed)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        harness
            .repository
            .count_by_status(OutboxStatus::DeadLetter)
            .await
            .unwrap(),
        0
    );

    // Every record was published at least once
    let published = harness.bus.published_on("outbox.events.user");
    assert!(published.len() >= TOTAL);

    let mut seen = HashSet::new();
    for record in &published {
        let wire: serde_json::Value = serde_json::from_str(&record.value).unwrap();
        seen.insert(wire["id"].as_str().unwrap().to_string());
    }
    assert_eq!(seen.len(), TOTAL);
}
