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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Outbox消息实体
///
/// 表示一条与业务写入同事务落库、等待中继发布的领域事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// 消息唯一标识符
    pub id: Uuid,
    /// 聚合根ID，作为总线分区键
    pub aggregate_id: String,
    /// 聚合根类型名
    pub aggregate_type: String,
    /// 事件类型名
    pub event_type: String,
    /// 事件负载（JSON文本）
    pub payload: String,
    /// 变更字段快照（JSON文本，仅更新事件）
    pub changed_fields: Option<String>,
    /// 消息状态
    pub status: OutboxStatus,
    /// 创建时间，中继排序键
    pub created_at: DateTime<Utc>,
    /// 终态时间
    pub processed_at: Option<DateTime<Utc>>,
    /// 已失败的发布尝试次数
    pub retry_count: i32,
    /// 最大重试次数
    pub max_retries: i32,
    /// 最近一次失败信息
    pub error_message: Option<String>,
    /// 当前持有租约的工作器ID
    pub worker_id: Option<String>,
    /// 乐观并发版本号
    pub version: i64,
}

impl OutboxMessage {
    pub fn new(
        aggregate_id: String,
        aggregate_type: String,
        event_type: String,
        payload: String,
        changed_fields: Option<String>,
        max_retries: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            aggregate_type,
            event_type,
            payload,
            changed_fields,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            retry_count: 0,
            max_retries,
            error_message: None,
            worker_id: None,
            version: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn is_sent(&self) -> bool {
        self.status == OutboxStatus::Sent
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutboxStatus::Failed
    }

    pub fn is_dead_letter(&self) -> bool {
        self.status == OutboxStatus::DeadLetter
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// 标记消息发布成功
    ///
    /// 进入终态SENT，清除错误信息
    pub fn mark_sent(&mut self) {
        self.status = OutboxStatus::Sent;
        self.processed_at = Some(Utc::now());
        self.error_message = None;
    }

    /// 标记一次发布失败
    ///
    /// 重试次数耗尽时进入DEAD_LETTER终态，否则回到PENDING等待下轮轮询
    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        self.error_message = Some(error_message.into());
        self.retry_count += 1;

        if self.can_retry() {
            self.status = OutboxStatus::Pending;
            self.worker_id = None;
        } else {
            self.status = OutboxStatus::DeadLetter;
            self.processed_at = Some(Utc::now());
        }
    }
}

/// Outbox消息状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    /// 待发布
    #[default]
    Pending,
    /// 已发布
    Sent,
    /// 发布失败
    Failed,
    /// 死信
    DeadLetter,
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboxStatus::Pending => write!(f, "PENDING"),
            OutboxStatus::Sent => write!(f, "SENT"),
            OutboxStatus::Failed => write!(f, "FAILED"),
            OutboxStatus::DeadLetter => write!(f, "DEAD_LETTER"),
        }
    }
}

#[cfg(test)]
#[path = "outbox_message_test.rs"]
mod tests;
