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
use crate::domain::registry::{AggregateMetadata, Operation, OutboxAggregate, OutboxRegistry};
use crate::domain::repositories::outbox_repository::RepositoryError;
use crate::infrastructure::repositories::outbox_repo_impl::OutboxRepositoryImpl;
use metrics::counter;
use sea_orm::{ConnectionTrait, DbErr};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, Instrument};

/// 捕获错误类型
///
/// 任一错误都必须使宿主事务回滚，业务写入绝不能在缺少
/// Outbox记录的情况下提交
#[derive(Error, Debug)]
pub enum CaptureError {
    /// 负载或变更字段序列化失败
    #[error("Failed to serialize outbox payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 无法确定聚合ID
    #[error("Unable to determine aggregate id for {aggregate_type}")]
    MissingAggregateId { aggregate_type: String },

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// 捕获拦截器
///
/// 在宿主事务内为被跟踪聚合的插入与更新物化一条Outbox记录。
/// 未注册的聚合类型是无操作。拦截器本身不产生额外I/O，
/// 仅向调用方传入的连接追加一次插入
pub struct OutboxCapture {
    registry: Arc<OutboxRegistry>,
}

impl OutboxCapture {
    pub fn new(registry: Arc<OutboxRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<OutboxRegistry> {
        self.registry.clone()
    }

    /// 捕获一次插入
    ///
    /// 在`conn`（通常是宿主打开的事务）上追加Outbox记录
    pub async fn capture_insert<A, C>(&self, conn: &C, aggregate: &A) -> Result<(), CaptureError>
    where
        A: OutboxAggregate + Sync,
        C: ConnectionTrait,
    {
        self.capture(conn, aggregate, None, Operation::Insert).await
    }

    /// 捕获一次更新
    ///
    /// `old`为写入前的状态快照，用于变更字段提取
    pub async fn capture_update<A, C>(
        &self,
        conn: &C,
        old: &A,
        new: &A,
    ) -> Result<(), CaptureError>
    where
        A: OutboxAggregate + Sync,
        C: ConnectionTrait,
    {
        self.capture(conn, new, Some(old), Operation::Update).await
    }

    async fn capture<A, C>(
        &self,
        conn: &C,
        aggregate: &A,
        old: Option<&A>,
        operation: Operation,
    ) -> Result<(), CaptureError>
    where
        A: OutboxAggregate + Sync,
        C: ConnectionTrait,
    {
        let Some(metadata) = self.registry.lookup_for::<A>() else {
            return Ok(());
        };

        let span = tracing::info_span!(
            "outbox.create_message",
            entity_type = A::aggregate_type(),
            operation = operation.as_str(),
        );

        async {
            let result = self
                .persist_message(conn, aggregate, old, operation, &metadata)
                .await;

            if let Err(e) = &result {
                error!(
                    "Failed to create outbox message for {} {}: {}",
                    A::aggregate_type(),
                    operation.as_str(),
                    e
                );
                counter!("outbox.creation.failures", "entity_type" => A::aggregate_type())
                    .increment(1);
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn persist_message<A, C>(
        &self,
        conn: &C,
        aggregate: &A,
        old: Option<&A>,
        operation: Operation,
        metadata: &AggregateMetadata,
    ) -> Result<(), CaptureError>
    where
        A: OutboxAggregate + Sync,
        C: ConnectionTrait,
    {
        let message = build_message(aggregate, old, operation, metadata)?;

        OutboxRepositoryImpl::insert_on(conn, &message)
            .await
            .map_err(|e| match e {
                RepositoryError::Database(db) => CaptureError::Database(db),
                other => CaptureError::Database(DbErr::Custom(other.to_string())),
            })?;

        counter!(
            "outbox.messages.created",
            "entity_type" => A::aggregate_type(),
            "event_type" => message.event_type.clone(),
        )
        .increment(1);

        debug!(
            "Created outbox message: id={}, aggregate_id={}, aggregate_type={}, event_type={}",
            message.id, message.aggregate_id, message.aggregate_type, message.event_type
        );

        Ok(())
    }
}

/// 构建Outbox消息
///
/// 负载优先取聚合的自定义投影，否则序列化整个聚合。
/// 更新且开启变更跟踪时按属性名成对比较新旧状态
fn build_message<A: OutboxAggregate>(
    aggregate: &A,
    old: Option<&A>,
    operation: Operation,
    metadata: &AggregateMetadata,
) -> Result<OutboxMessage, CaptureError> {
    let payload_value = match aggregate.outbox_payload() {
        Some(value) => value,
        None => serde_json::to_value(aggregate)?,
    };

    let aggregate_id = match aggregate.aggregate_id() {
        Some(id) if !id.is_empty() => id,
        _ => {
            let serialized = serde_json::to_value(aggregate)?;
            id_from_serialized(&serialized).ok_or_else(|| CaptureError::MissingAggregateId {
                aggregate_type: A::aggregate_type().to_string(),
            })?
        }
    };

    let changed_fields = match (operation, old) {
        (Operation::Update, Some(old)) if metadata.include_changed_fields => {
            let old_state = serde_json::to_value(old)?;
            let new_state = serde_json::to_value(aggregate)?;
            Some(serde_json::to_string(&changed_fields_between(
                &old_state, &new_state,
            ))?)
        }
        _ => None,
    };

    Ok(OutboxMessage::new(
        aggregate_id,
        metadata.aggregate_type.clone(),
        metadata.event_type(operation).to_string(),
        serde_json::to_string(&payload_value)?,
        changed_fields,
        metadata.max_retries,
    ))
}

/// 从序列化后的聚合中按常规字段名提取ID
fn id_from_serialized(serialized: &Value) -> Option<String> {
    let object = serialized.as_object()?;

    for name in ["id", "entity_id", "entityId", "primary_key", "primaryKey"] {
        match object.get(name) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => return Some(s.clone()),
            Some(other) => return Some(other.to_string()),
        }
    }

    None
}

/// 按属性名成对比较新旧状态，返回差异映射
///
/// 比较使用值相等而非引用同一性；键取两侧属性名的并集
fn changed_fields_between(
    old_state: &Value,
    new_state: &Value,
) -> serde_json::Map<String, Value> {
    let empty = serde_json::Map::new();
    let old_object = old_state.as_object().unwrap_or(&empty);
    let new_object = new_state.as_object().unwrap_or(&empty);

    let mut names: Vec<&String> = old_object.keys().collect();
    for name in new_object.keys() {
        if !old_object.contains_key(name) {
            names.push(name);
        }
    }

    let mut changed = serde_json::Map::new();
    for name in names {
        let old_value = old_object.get(name).cloned().unwrap_or(Value::Null);
        let new_value = new_object.get(name).cloned().unwrap_or(Value::Null);

        if old_value != new_value {
            changed.insert(
                name.clone(),
                serde_json::json!({
                    "oldValue": old_value,
                    "newValue": new_value,
                }),
            );
        }
    }

    changed
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod tests;
