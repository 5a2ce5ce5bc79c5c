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

use crate::domain::models::outbox_message::{OutboxMessage, OutboxStatus};
use crate::domain::repositories::outbox_repository::{
    MarkFailedOutcome, OutboxRepository, RepositoryError,
};
use crate::infrastructure::database::entities::outbox_message::{self, SeaOutboxStatus};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// Outbox消息仓库实现
///
/// 基于SeaORM实现的Outbox数据访问层。修改操作全部通过
/// `update_many` + 版本过滤实现乐观并发，不依赖SKIP LOCKED
#[derive(Clone)]
pub struct OutboxRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl OutboxRepositoryImpl {
    /// 创建新的Outbox仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 在调用方的连接或事务上插入一条Outbox消息
    ///
    /// 捕获拦截器通过此入口将消息与业务写入挂到同一事务
    pub async fn insert_on<C: ConnectionTrait>(
        conn: &C,
        message: &OutboxMessage,
    ) -> Result<(), RepositoryError> {
        let active_model: outbox_message::ActiveModel = message.into();

        outbox_message::Entity::insert(active_model)
            .exec(conn)
            .await?;

        Ok(())
    }
}

impl From<OutboxStatus> for SeaOutboxStatus {
    fn from(status: OutboxStatus) -> Self {
        match status {
            OutboxStatus::Pending => SeaOutboxStatus::Pending,
            OutboxStatus::Sent => SeaOutboxStatus::Sent,
            OutboxStatus::Failed => SeaOutboxStatus::Failed,
            OutboxStatus::DeadLetter => SeaOutboxStatus::DeadLetter,
        }
    }
}

impl From<SeaOutboxStatus> for OutboxStatus {
    fn from(status: SeaOutboxStatus) -> Self {
        match status {
            SeaOutboxStatus::Pending => OutboxStatus::Pending,
            SeaOutboxStatus::Sent => OutboxStatus::Sent,
            SeaOutboxStatus::Failed => OutboxStatus::Failed,
            SeaOutboxStatus::DeadLetter => OutboxStatus::DeadLetter,
        }
    }
}

impl From<outbox_message::Model> for OutboxMessage {
    fn from(model: outbox_message::Model) -> Self {
        Self {
            id: model.id,
            aggregate_id: model.aggregate_id,
            aggregate_type: model.aggregate_type,
            event_type: model.event_type,
            payload: model.payload,
            changed_fields: model.changed_fields,
            status: model.status.into(),
            created_at: model.created_at.into(),
            processed_at: model.processed_at.map(Into::into),
            retry_count: model.retry_count,
            max_retries: model.max_retries,
            error_message: model.error_message,
            worker_id: model.worker_id,
            version: model.version,
        }
    }
}

impl From<&OutboxMessage> for outbox_message::ActiveModel {
    fn from(message: &OutboxMessage) -> Self {
        Self {
            id: Set(message.id),
            aggregate_id: Set(message.aggregate_id.clone()),
            aggregate_type: Set(message.aggregate_type.clone()),
            event_type: Set(message.event_type.clone()),
            payload: Set(message.payload.clone()),
            changed_fields: Set(message.changed_fields.clone()),
            status: Set(message.status.into()),
            created_at: Set(message.created_at.into()),
            processed_at: Set(message.processed_at.map(Into::into)),
            retry_count: Set(message.retry_count),
            max_retries: Set(message.max_retries),
            error_message: Set(message.error_message.clone()),
            worker_id: Set(message.worker_id.clone()),
            version: Set(message.version),
        }
    }
}

#[async_trait]
impl OutboxRepository for OutboxRepositoryImpl {
    async fn lease_pending(
        &self,
        worker_id: &str,
        limit: u64,
    ) -> Result<Vec<OutboxMessage>, RepositoryError> {
        let models = outbox_message::Entity::find()
            .filter(outbox_message::Column::Status.eq(SeaOutboxStatus::Pending))
            .filter(
                Condition::any()
                    .add(outbox_message::Column::WorkerId.is_null())
                    .add(outbox_message::Column::WorkerId.eq(worker_id)),
            )
            .order_by_asc(outbox_message::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn claim(
        &self,
        message: &OutboxMessage,
        worker_id: &str,
    ) -> Result<Option<OutboxMessage>, RepositoryError> {
        let result = outbox_message::Entity::update_many()
            .col_expr(
                outbox_message::Column::WorkerId,
                Expr::value(Some(worker_id.to_string())),
            )
            .col_expr(
                outbox_message::Column::Version,
                Expr::col(outbox_message::Column::Version).add(1),
            )
            .filter(outbox_message::Column::Id.eq(message.id))
            .filter(outbox_message::Column::Version.eq(message.version))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let mut claimed = message.clone();
        claimed.worker_id = Some(worker_id.to_string());
        claimed.version += 1;
        Ok(Some(claimed))
    }

    async fn mark_sent(&self, message: &OutboxMessage) -> Result<bool, RepositoryError> {
        let result = outbox_message::Entity::update_many()
            .col_expr(
                outbox_message::Column::Status,
                Expr::value(SeaOutboxStatus::Sent),
            )
            .col_expr(
                outbox_message::Column::ProcessedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(Utc::now().into())),
            )
            .col_expr(
                outbox_message::Column::ErrorMessage,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                outbox_message::Column::Version,
                Expr::col(outbox_message::Column::Version).add(1),
            )
            .filter(outbox_message::Column::Id.eq(message.id))
            .filter(outbox_message::Column::Version.eq(message.version))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn mark_failed(
        &self,
        message: &OutboxMessage,
        error: &str,
    ) -> Result<MarkFailedOutcome, RepositoryError> {
        let mut updated = message.clone();
        updated.mark_failed(error);

        let result = outbox_message::Entity::update_many()
            .col_expr(
                outbox_message::Column::Status,
                Expr::value(SeaOutboxStatus::from(updated.status)),
            )
            .col_expr(
                outbox_message::Column::RetryCount,
                Expr::value(updated.retry_count),
            )
            .col_expr(
                outbox_message::Column::ErrorMessage,
                Expr::value(updated.error_message.clone()),
            )
            .col_expr(
                outbox_message::Column::WorkerId,
                Expr::value(updated.worker_id.clone()),
            )
            .col_expr(
                outbox_message::Column::ProcessedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(updated.processed_at.map(Into::into)),
            )
            .col_expr(
                outbox_message::Column::Version,
                Expr::col(outbox_message::Column::Version).add(1),
            )
            .filter(outbox_message::Column::Id.eq(message.id))
            .filter(outbox_message::Column::Version.eq(message.version))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Ok(MarkFailedOutcome::Conflict);
        }

        if updated.is_dead_letter() {
            Ok(MarkFailedOutcome::DeadLettered)
        } else {
            Ok(MarkFailedOutcome::Requeued)
        }
    }

    async fn count_by_status(&self, status: OutboxStatus) -> Result<u64, RepositoryError> {
        let count = outbox_message::Entity::find()
            .filter(outbox_message::Column::Status.eq(SeaOutboxStatus::from(status)))
            .count(self.db.as_ref())
            .await?;

        Ok(count)
    }

    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = outbox_message::Entity::delete_many()
            .filter(outbox_message::Column::Status.eq(SeaOutboxStatus::Sent))
            .filter(outbox_message::Column::ProcessedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OutboxMessage>, RepositoryError> {
        let model = outbox_message::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_aggregate_id(
        &self,
        aggregate_id: &str,
    ) -> Result<Vec<OutboxMessage>, RepositoryError> {
        let models = outbox_message::Entity::find()
            .filter(outbox_message::Column::AggregateId.eq(aggregate_id))
            .order_by_asc(outbox_message::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
