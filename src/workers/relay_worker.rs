// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::envelope::EventEnvelope;
use crate::domain::models::outbox_message::{OutboxMessage, OutboxStatus};
use crate::domain::repositories::outbox_repository::{MarkFailedOutcome, OutboxRepository};
use crate::infrastructure::bus::message_bus::MessageBus;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// 中继工作器
///
/// 固定间隔轮询Outbox表，将PENDING消息按created_at顺序发布到总线。
/// 多个工作器可并发运行于同一张表，互斥完全依赖记录上的
/// (status, version)守卫，单轮内记录串行处理以保持按键有序
pub struct RelayWorker<R, B>
where
    R: OutboxRepository,
    B: MessageBus,
{
    /// Outbox仓库
    repository: Arc<R>,
    /// 消息总线
    bus: Arc<B>,
    /// 工作器标识
    worker_id: String,
    /// 单次轮询的最大记录数
    batch_size: u64,
    /// 轮询间隔
    polling_interval: Duration,
    /// 信封主题前缀
    topic_prefix: String,
    /// 死信主题
    dead_letter_topic: String,
}

impl<R, B> RelayWorker<R, B>
where
    R: OutboxRepository,
    B: MessageBus,
{
    pub fn new(
        repository: Arc<R>,
        bus: Arc<B>,
        worker_id: String,
        batch_size: u64,
        polling_interval: Duration,
        topic_prefix: String,
        dead_letter_topic: String,
    ) -> Self {
        Self {
            repository,
            bus,
            worker_id,
            batch_size,
            polling_interval,
            topic_prefix,
            dead_letter_topic,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// 运行轮询循环
    ///
    /// 取消信号触发后完成当前记录的发布与状态写回再退出
    pub async fn run_loop(&self, cancel: CancellationToken) {
        info!("Outbox relay worker {} started", self.worker_id);

        let mut interval = tokio::time::interval(self.polling_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Outbox relay worker {} stopping", self.worker_id);
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.process_pending_messages(&cancel).await {
                        error!("Error processing pending outbox messages: {}", e);
                    }
                }
            }
        }
    }

    /// 执行一轮轮询
    ///
    /// 租用一批PENDING消息并逐条发布；空批次直接返回
    pub async fn process_pending_messages(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), WorkerError> {
        counter!("outbox.relay.polling").increment(1);

        let span = tracing::info_span!("outbox.relay.process", worker_id = %self.worker_id);

        async {
            let batch = self
                .repository
                .lease_pending(&self.worker_id, self.batch_size)
                .await?;

            if batch.is_empty() {
                debug!("No pending outbox messages to process");
                return Ok(());
            }

            info!("Processing {} pending outbox messages", batch.len());

            let mut processed = 0u64;
            let mut failed = 0u64;

            for message in batch {
                // Finish the in-flight record, then honor the cancellation
                if cancel.is_cancelled() {
                    break;
                }

                match self.process_message(message).await? {
                    RecordOutcome::Sent => processed += 1,
                    RecordOutcome::Failed => failed += 1,
                    RecordOutcome::Skipped => {}
                }
            }

            self.refresh_gauges().await?;

            debug!(
                "Poll pass complete: sent={}, failed={}, worker={}",
                processed, failed, self.worker_id
            );

            Ok(())
        }
        .instrument(span)
        .await
    }

    /// 处理单条消息
    async fn process_message(&self, message: OutboxMessage) -> Result<RecordOutcome, WorkerError> {
        let span = tracing::info_span!(
            "outbox.relay.process_message",
            message_id = %message.id,
            aggregate_type = %message.aggregate_type,
            event_type = %message.event_type,
            worker_id = %self.worker_id,
        );

        async {
            let Some(claimed) = self.repository.claim(&message, &self.worker_id).await? else {
                debug!("Lost claim race for outbox message {}", message.id);
                return Ok(RecordOutcome::Skipped);
            };

            let wire = match EventEnvelope::from_message(&claimed, &self.worker_id)
                .and_then(|envelope| envelope.to_json())
            {
                Ok(wire) => wire,
                Err(e) => {
                    error!("Failed to build envelope for message {}: {}", claimed.id, e);
                    self.handle_failure(&claimed, &e.to_string(), None).await?;
                    return Ok(RecordOutcome::Failed);
                }
            };

            let topic = self.topic_name(&claimed.aggregate_type);
            let start = Instant::now();
            let published = self.bus.publish(&topic, &claimed.aggregate_id, &wire).await;
            histogram!(
                "outbox.processing.time",
                "entity_type" => claimed.aggregate_type.clone(),
            )
            .record(start.elapsed().as_secs_f64());

            match published {
                Ok(()) => {
                    if self.repository.mark_sent(&claimed).await? {
                        counter!(
                            "outbox.messages.processed",
                            "entity_type" => claimed.aggregate_type.clone(),
                            "status" => "SENT",
                        )
                        .increment(1);
                        debug!("Successfully processed outbox message: {}", claimed.id);
                        Ok(RecordOutcome::Sent)
                    } else {
                        debug!(
                            "Another worker already finalized outbox message {}",
                            claimed.id
                        );
                        Ok(RecordOutcome::Skipped)
                    }
                }
                Err(e) => {
                    error!(
                        "Failed to publish outbox message {} to {}: {}",
                        claimed.id, topic, e
                    );
                    self.handle_failure(&claimed, &e.to_string(), Some(&wire))
                        .await?;
                    Ok(RecordOutcome::Failed)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// 记录一次发布失败
    ///
    /// 预算耗尽时尽力向死信主题镜像一份信封，镜像失败只记日志
    async fn handle_failure(
        &self,
        message: &OutboxMessage,
        error: &str,
        wire: Option<&str>,
    ) -> Result<(), WorkerError> {
        match self.repository.mark_failed(message, error).await? {
            MarkFailedOutcome::DeadLettered => {
                counter!(
                    "outbox.messages.processed",
                    "entity_type" => message.aggregate_type.clone(),
                    "status" => "DEAD_LETTER",
                )
                .increment(1);
                warn!(
                    "Outbox message {} moved to dead letter after {} attempts",
                    message.id, message.max_retries
                );

                if let Some(wire) = wire {
                    if let Err(e) = self
                        .bus
                        .publish(&self.dead_letter_topic, &message.id.to_string(), wire)
                        .await
                    {
                        error!(
                            "Failed to publish message {} to dead letter topic: {}",
                            message.id, e
                        );
                    }
                }
            }
            MarkFailedOutcome::Requeued => {
                counter!(
                    "outbox.messages.processed",
                    "entity_type" => message.aggregate_type.clone(),
                    "status" => "FAILED",
                )
                .increment(1);
            }
            MarkFailedOutcome::Conflict => {
                debug!(
                    "Another worker already moved outbox message {}",
                    message.id
                );
            }
        }

        Ok(())
    }

    /// 刷新待发布/失败/死信数量仪表
    async fn refresh_gauges(&self) -> Result<(), WorkerError> {
        let pending = self.repository.count_by_status(OutboxStatus::Pending).await?;
        gauge!("outbox.messages.pending").set(pending as f64);

        let failed = self.repository.count_by_status(OutboxStatus::Failed).await?;
        gauge!("outbox.messages.failed").set(failed as f64);

        let dead_letter = self
            .repository
            .count_by_status(OutboxStatus::DeadLetter)
            .await?;
        gauge!("outbox.messages.dead_letter").set(dead_letter as f64);

        Ok(())
    }

    fn topic_name(&self, aggregate_type: &str) -> String {
        format!("{}.{}", self.topic_prefix, aggregate_type.to_lowercase())
    }
}

/// 单条消息的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Sent,
    Failed,
    Skipped,
}

#[async_trait]
impl<R, B> Worker for RelayWorker<R, B>
where
    R: OutboxRepository + 'static,
    B: MessageBus + 'static,
{
    async fn run(&self, cancel: CancellationToken) -> Result<(), WorkerError> {
        self.run_loop(cancel).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "outbox-relay"
    }
}

#[cfg(test)]
#[path = "relay_worker_test.rs"]
mod tests;
