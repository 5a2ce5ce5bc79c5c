#[cfg(test)]
mod tests {
    use crate::domain::models::outbox_message::{OutboxMessage, OutboxStatus};

    fn message(max_retries: i32) -> OutboxMessage {
        OutboxMessage::new(
            "42".to_string(),
            "User".to_string(),
            "USER_INSERT".to_string(),
            "{}".to_string(),
            None,
            max_retries,
        )
    }

    #[test]
    fn test_new_message_is_pending() {
        let msg = message(3);
        assert!(msg.is_pending());
        assert_eq!(msg.retry_count, 0);
        assert_eq!(msg.version, 0);
        assert!(msg.processed_at.is_none());
        assert!(msg.worker_id.is_none());
    }

    #[test]
    fn test_mark_sent_clears_error() {
        let mut msg = message(3);
        msg.error_message = Some("broker unavailable".to_string());
        msg.mark_sent();

        assert!(msg.is_sent());
        assert!(msg.processed_at.is_some());
        assert!(msg.error_message.is_none());
    }

    #[test]
    fn test_mark_failed_returns_to_pending_while_budget_remains() {
        let mut msg = message(3);
        msg.worker_id = Some("worker-1".to_string());
        msg.mark_failed("timeout");

        assert!(msg.is_pending());
        assert_eq!(msg.retry_count, 1);
        assert!(msg.worker_id.is_none());
        assert!(msg.processed_at.is_none());
        assert_eq!(msg.error_message.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_mark_failed_promotes_to_dead_letter_when_exhausted() {
        let mut msg = message(3);
        msg.mark_failed("a");
        msg.mark_failed("b");
        msg.mark_failed("c");

        assert!(msg.is_dead_letter());
        assert_eq!(msg.retry_count, 3);
        assert!(msg.processed_at.is_some());
        assert!(!msg.can_retry());
    }

    #[test]
    fn test_status_display_matches_persisted_values() {
        assert_eq!(OutboxStatus::Pending.to_string(), "PENDING");
        assert_eq!(OutboxStatus::Sent.to_string(), "SENT");
        assert_eq!(OutboxStatus::Failed.to_string(), "FAILED");
        assert_eq!(OutboxStatus::DeadLetter.to_string(), "DEAD_LETTER");
    }
}
