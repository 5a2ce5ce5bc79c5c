// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::TestHarness;
use outbox_relay::domain::models::envelope::EventEnvelope;
use outbox_relay::domain::models::outbox_message::OutboxStatus;
use outbox_relay::domain::repositories::outbox_repository::OutboxRepository;
use outbox_relay::example::user::User;
use outbox_relay::infrastructure::bus::message_bus::MessageBus;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_broker_outage_retries_until_recovery() {
    let harness = TestHarness::new().await;
    for id in 1..=5 {
        let user = User::new(id, format!("u{}@x", id), "J", "D");
        harness.users.create(&user).await.unwrap();
    }

    harness.bus.set_failing(true);
    let worker = harness.relay_worker("worker-1");

    for _ in 0..2 {
        worker
            .process_pending_messages(&CancellationToken::new())
            .await
            .unwrap();
    }

    let pending = harness
        .repository
        .count_by_status(OutboxStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending, 5);

    for id in 1..=5 {
        let records = harness
            .repository
            .find_by_aggregate_id(&id.to_string())
            .await
            .unwrap();
        assert_eq!(records[0].retry_count, 2);
    }

    // Broker comes back; the next poll drains everything
    harness.bus.set_failing(false);
    worker
        .process_pending_messages(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        harness
            .repository
            .count_by_status(OutboxStatus::Sent)
            .await
            .unwrap(),
        5
    );
    assert_eq!(harness.bus.published_on("outbox.events.user").len(), 5);
}

#[tokio::test]
async fn test_crash_between_publish_ack_and_status_write_republishes() {
    let harness = TestHarness::new().await;
    let user = User::new(1, "a@x", "J", "D");
    harness.users.create(&user).await.unwrap();

    // First worker run: claim, publish, then die before the status write
    let records = harness.repository.find_by_aggregate_id("1").await.unwrap();
    let claimed = harness
        .repository
        .claim(&records[0], "worker-1")
        .await
        .unwrap()
        .unwrap();
    let wire = EventEnvelope::from_message(&claimed, "worker-1")
        .unwrap()
        .to_json()
        .unwrap();
    harness
        .bus
        .publish("outbox.events.user", "1", &wire)
        .await
        .unwrap();

    // The record is still pending and leased to the crashed identity
    let stored = harness
        .repository
        .find_by_id(claimed.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_pending());
    assert_eq!(stored.worker_id.as_deref(), Some("worker-1"));

    // The restarted worker reuses its stable identity and re-publishes
    let worker = harness.relay_worker("worker-1");
    worker
        .process_pending_messages(&CancellationToken::new())
        .await
        .unwrap();

    let published = harness.bus.published_on("outbox.events.user");
    assert_eq!(published.len(), 2);

    let stored = harness
        .repository
        .find_by_id(claimed.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_sent());
}
