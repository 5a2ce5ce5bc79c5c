// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::TestHarness;
use outbox_relay::domain::models::outbox_message::{OutboxMessage, OutboxStatus};
use outbox_relay::domain::repositories::outbox_repository::{MarkFailedOutcome, OutboxRepository};
use outbox_relay::infrastructure::repositories::outbox_repo_impl::OutboxRepositoryImpl;

async fn insert_pending(harness: &TestHarness, aggregate_id: &str) -> OutboxMessage {
    let message = OutboxMessage::new(
        aggregate_id.to_string(),
        "User".to_string(),
        "USER_INSERT".to_string(),
        "{}".to_string(),
        None,
        3,
    );
    OutboxRepositoryImpl::insert_on(harness.db.as_ref(), &message)
        .await
        .unwrap();
    message
}

#[tokio::test]
async fn test_claim_is_won_by_exactly_one_worker() {
    let harness = TestHarness::new().await;
    let message = insert_pending(&harness, "1").await;

    // Both workers hold the same snapshot of the record
    let first = harness.repository.claim(&message, "worker-a").await.unwrap();
    let second = harness.repository.claim(&message, "worker-b").await.unwrap();

    assert!(first.is_some());
    assert!(second.is_none());

    let stored = harness
        .repository
        .find_by_id(message.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.worker_id.as_deref(), Some("worker-a"));
    assert_eq!(stored.version, message.version + 1);
}

#[tokio::test]
async fn test_mark_sent_with_stale_version_does_not_regress_status() {
    let harness = TestHarness::new().await;
    let message = insert_pending(&harness, "1").await;

    let claimed = harness
        .repository
        .claim(&message, "worker-a")
        .await
        .unwrap()
        .unwrap();
    assert!(harness.repository.mark_sent(&claimed).await.unwrap());

    // A second attempt carries the pre-write version and must lose
    assert!(!harness.repository.mark_sent(&claimed).await.unwrap());

    let stored = harness
        .repository
        .find_by_id(message.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_sent());
    assert_eq!(stored.version, claimed.version + 1);
}

#[tokio::test]
async fn test_mark_failed_with_stale_version_reports_conflict() {
    let harness = TestHarness::new().await;
    let message = insert_pending(&harness, "1").await;

    let claimed = harness
        .repository
        .claim(&message, "worker-a")
        .await
        .unwrap()
        .unwrap();
    assert!(harness.repository.mark_sent(&claimed).await.unwrap());

    let outcome = harness
        .repository
        .mark_failed(&claimed, "late failure")
        .await
        .unwrap();
    assert_eq!(outcome, MarkFailedOutcome::Conflict);

    let stored = harness
        .repository
        .find_by_id(message.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_sent());
    assert!(stored.error_message.is_none());
}

#[tokio::test]
async fn test_lease_pending_skips_records_held_by_other_workers() {
    let harness = TestHarness::new().await;
    let free = insert_pending(&harness, "1").await;
    let taken = insert_pending(&harness, "2").await;
    harness
        .repository
        .claim(&taken, "worker-b")
        .await
        .unwrap()
        .unwrap();

    let own = harness
        .repository
        .lease_pending("worker-a", 10)
        .await
        .unwrap();
    let ids: Vec<_> = own.iter().map(|m| m.id).collect();
    assert!(ids.contains(&free.id));
    assert!(!ids.contains(&taken.id));

    // The holder still sees its own record
    let holders = harness
        .repository
        .lease_pending("worker-b", 10)
        .await
        .unwrap();
    assert!(holders.iter().any(|m| m.id == taken.id));
}

#[tokio::test]
async fn test_count_by_status_tracks_lifecycle() {
    let harness = TestHarness::new().await;
    let message = insert_pending(&harness, "1").await;
    insert_pending(&harness, "2").await;

    assert_eq!(
        harness
            .repository
            .count_by_status(OutboxStatus::Pending)
            .await
            .unwrap(),
        2
    );

    let claimed = harness
        .repository
        .claim(&message, "worker-a")
        .await
        .unwrap()
        .unwrap();
    harness.repository.mark_sent(&claimed).await.unwrap();

    assert_eq!(
        harness
            .repository
            .count_by_status(OutboxStatus::Pending)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        harness
            .repository
            .count_by_status(OutboxStatus::Sent)
            .await
            .unwrap(),
        1
    );
}
