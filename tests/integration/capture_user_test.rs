// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::TestHarness;
use outbox_relay::domain::models::outbox_message::OutboxStatus;
use outbox_relay::domain::repositories::outbox_repository::OutboxRepository;
use outbox_relay::example::user::User;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_created_user_reaches_the_bus_as_insert_event() {
    let harness = TestHarness::new().await;
    let user = User::new(1, "a@x", "J", "D");

    harness.users.create(&user).await.unwrap();

    let worker = harness.relay_worker("worker-1");
    worker
        .process_pending_messages(&CancellationToken::new())
        .await
        .unwrap();

    let published = harness.bus.published_on("outbox.events.user");
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].key, "1");

    let wire: serde_json::Value = serde_json::from_str(&published[0].value).unwrap();
    assert_eq!(wire["aggregateType"], "User");
    assert_eq!(wire["eventType"], "USER_INSERT");
    assert_eq!(wire["payload"]["id"], 1);
    assert_eq!(wire["payload"]["email"], "a@x");
    assert_eq!(wire["payload"]["firstName"], "J");
    assert_eq!(wire["payload"]["lastName"], "D");
    assert_eq!(wire["payload"]["isActive"], true);
    assert!(wire["changedFields"].is_null());
}

#[tokio::test]
async fn test_renamed_user_carries_exact_changed_fields() {
    let harness = TestHarness::new().await;
    let user = User::new(1, "a@x", "J", "D");
    harness.users.create(&user).await.unwrap();

    let old = harness.users.find_by_id(1).await.unwrap().unwrap();
    let mut renamed = old.clone();
    renamed.first_name = "Jane".to_string();
    harness.users.update(&old, &renamed).await.unwrap();

    let worker = harness.relay_worker("worker-1");
    worker
        .process_pending_messages(&CancellationToken::new())
        .await
        .unwrap();

    let published = harness.bus.published_on("outbox.events.user");
    assert_eq!(published.len(), 2);

    let wire: serde_json::Value = serde_json::from_str(&published[1].value).unwrap();
    assert_eq!(wire["eventType"], "USER_UPDATE");
    assert_eq!(
        wire["changedFields"],
        serde_json::json!({"firstName": {"oldValue": "J", "newValue": "Jane"}})
    );
}

#[tokio::test]
async fn test_failed_business_write_leaves_no_outbox_record() {
    let harness = TestHarness::new().await;
    let user = User::new(1, "a@x", "J", "D");
    harness.users.create(&user).await.unwrap();

    // Same primary key makes the business insert fail; the capture must
    // roll back with it
    let duplicate = User::new(1, "b@x", "K", "E");
    assert!(harness.users.create(&duplicate).await.is_err());

    let records = harness.repository.find_by_aggregate_id("1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, "USER_INSERT");
    assert!(records[0].status == OutboxStatus::Pending);
}

#[tokio::test]
async fn test_payload_uses_the_custom_projection() {
    let harness = TestHarness::new().await;
    let user = User::new(1, "a@x", "J", "D");
    harness.users.create(&user).await.unwrap();

    let records = harness.repository.find_by_aggregate_id("1").await.unwrap();
    let stored: serde_json::Value = serde_json::from_str(&records[0].payload).unwrap();

    use outbox_relay::domain::registry::OutboxAggregate;
    assert_eq!(stored, user.outbox_payload().unwrap());
}
