// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::outbox_repository::OutboxRepository;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Outbox清理工作器
///
/// 按cron调度删除超过保留期的SENT消息。
/// 死信消息永不清理，留待运维处置
pub struct CleanupWorker<R>
where
    R: OutboxRepository,
{
    repository: Arc<R>,
    schedule: Schedule,
    retention: chrono::Duration,
}

impl<R> CleanupWorker<R>
where
    R: OutboxRepository,
{
    pub fn new(
        repository: Arc<R>,
        cron_expression: &str,
        retention_days: i64,
    ) -> Result<Self, WorkerError> {
        let schedule = Schedule::from_str(cron_expression)
            .map_err(|e| WorkerError::InvalidSchedule(e.to_string()))?;

        Ok(Self {
            repository,
            schedule,
            retention: chrono::Duration::days(retention_days),
        })
    }

    /// 运行清理循环
    pub async fn run_loop(&self, cancel: CancellationToken) {
        info!("Outbox cleanup worker started");

        loop {
            let Some(next_fire) = self.schedule.upcoming(Utc).next() else {
                error!("Cleanup schedule yields no upcoming fire time");
                return;
            };

            let wait = (next_fire - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Outbox cleanup worker stopping");
                    return;
                }
                _ = tokio::time::sleep(wait) => {
                    match self.cleanup_old_messages().await {
                        Ok(count) => {
                            if count > 0 {
                                info!("Cleaned up {} old processed messages", count);
                            }
                        }
                        Err(e) => {
                            error!("Error during cleanup of old messages: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// 删除保留期之前的SENT消息
    pub async fn cleanup_old_messages(&self) -> Result<u64, WorkerError> {
        let cutoff = Utc::now() - self.retention;
        let deleted = self.repository.delete_sent_before(cutoff).await?;
        Ok(deleted)
    }
}

#[async_trait]
impl<R> Worker for CleanupWorker<R>
where
    R: OutboxRepository + 'static,
{
    async fn run(&self, cancel: CancellationToken) -> Result<(), WorkerError> {
        self.run_loop(cancel).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "outbox-cleanup"
    }
}

#[cfg(test)]
#[path = "cleanup_worker_test.rs"]
mod tests;
