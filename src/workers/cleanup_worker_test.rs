#[cfg(test)]
mod tests {
    use crate::domain::models::outbox_message::{OutboxMessage, OutboxStatus};
    use crate::domain::repositories::outbox_repository::OutboxRepository;
    use crate::infrastructure::repositories::outbox_repo_impl::OutboxRepositoryImpl;
    use crate::workers::cleanup_worker::CleanupWorker;
    use chrono::{Duration, Utc};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use std::sync::Arc;

    async fn setup_db() -> Arc<DatabaseConnection> {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let db = Arc::new(db);
        Migrator::up(db.as_ref(), None).await.unwrap();
        db
    }

    async fn insert_with_status(
        db: &DatabaseConnection,
        status: OutboxStatus,
        processed_days_ago: Option<i64>,
    ) -> OutboxMessage {
        let mut message = OutboxMessage::new(
            "1".to_string(),
            "User".to_string(),
            "USER_INSERT".to_string(),
            "{}".to_string(),
            None,
            3,
        );
        message.status = status;
        message.processed_at = processed_days_ago.map(|days| Utc::now() - Duration::days(days));

        OutboxRepositoryImpl::insert_on(db, &message).await.unwrap();
        message
    }

    #[tokio::test]
    async fn test_cleanup_deletes_only_expired_sent_messages() {
        let db = setup_db().await;
        let repository = Arc::new(OutboxRepositoryImpl::new(db.clone()));
        let worker = CleanupWorker::new(repository.clone(), "0 0 2 * * *", 30).unwrap();

        let expired_sent = insert_with_status(&db, OutboxStatus::Sent, Some(40)).await;
        let recent_sent = insert_with_status(&db, OutboxStatus::Sent, Some(1)).await;
        let pending = insert_with_status(&db, OutboxStatus::Pending, None).await;
        let dead_letter = insert_with_status(&db, OutboxStatus::DeadLetter, Some(90)).await;

        let deleted = worker.cleanup_old_messages().await.unwrap();
        assert_eq!(deleted, 1);

        assert!(repository
            .find_by_id(expired_sent.id)
            .await
            .unwrap()
            .is_none());
        assert!(repository.find_by_id(recent_sent.id).await.unwrap().is_some());
        assert!(repository.find_by_id(pending.id).await.unwrap().is_some());
        // Dead-lettered records are kept for operator action
        assert!(repository.find_by_id(dead_letter.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_with_nothing_to_delete() {
        let db = setup_db().await;
        let repository = Arc::new(OutboxRepositoryImpl::new(db.clone()));
        let worker = CleanupWorker::new(repository, "0 0 2 * * *", 30).unwrap();

        let deleted = worker.cleanup_old_messages().await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_invalid_cron_expression_is_rejected() {
        let db = setup_db().await;
        let repository = Arc::new(OutboxRepositoryImpl::new(db.clone()));

        assert!(CleanupWorker::new(repository, "not a schedule", 30).is_err());
    }
}
