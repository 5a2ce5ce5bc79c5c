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

use crate::domain::models::outbox_message::OutboxMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 发布到总线的事件信封
///
/// 字段名采用camelCase，作为对外的线格式契约
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: Uuid,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub changed_fields: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub metadata: EnvelopeMetadata,
}

/// 信封元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    pub worker_id: String,
    pub version: i64,
}

impl EventEnvelope {
    /// 由Outbox消息构建信封
    ///
    /// payload与changed_fields列存储为JSON文本，这里解析回JSON值再嵌入信封
    pub fn from_message(
        message: &OutboxMessage,
        worker_id: &str,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::from_str(&message.payload)?;
        let changed_fields = message
            .changed_fields
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Self {
            id: message.id,
            aggregate_id: message.aggregate_id.clone(),
            aggregate_type: message.aggregate_type.clone(),
            event_type: message.event_type.clone(),
            payload,
            changed_fields,
            created_at: message.created_at,
            metadata: EnvelopeMetadata {
                worker_id: worker_id.to_string(),
                version: message.version,
            },
        })
    }

    /// 序列化为UTF-8 JSON文本
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
