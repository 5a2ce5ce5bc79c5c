// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::outbox_message::{OutboxMessage, OutboxStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 失败标记的结果
///
/// 所有状态迁移都带版本守卫，丢失竞争时返回Conflict由调用方放弃该记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkFailedOutcome {
    /// 重试预算未耗尽，记录回到PENDING
    Requeued,
    /// 重试预算耗尽，记录进入DEAD_LETTER
    DeadLettered,
    /// 版本冲突，其他工作器已接管该记录
    Conflict,
}

/// Outbox消息仓库特质
///
/// 定义中继所需的Outbox数据访问接口。所有修改操作使用乐观并发：
/// UPDATE携带`WHERE id = :id AND version = :seen_version`，零行更新
/// 表示记录已被其他工作器接管
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// 查询可由指定工作器租用的待发布消息，按created_at升序
    async fn lease_pending(
        &self,
        worker_id: &str,
        limit: u64,
    ) -> Result<Vec<OutboxMessage>, RepositoryError>;

    /// 以版本守卫认领一条消息
    ///
    /// 成功返回认领后的消息（worker_id已设置、版本已递增），
    /// 丢失竞争返回None
    async fn claim(
        &self,
        message: &OutboxMessage,
        worker_id: &str,
    ) -> Result<Option<OutboxMessage>, RepositoryError>;

    /// 标记消息发布成功，返回是否写入成功
    async fn mark_sent(&self, message: &OutboxMessage) -> Result<bool, RepositoryError>;

    /// 标记一次发布失败
    async fn mark_failed(
        &self,
        message: &OutboxMessage,
        error: &str,
    ) -> Result<MarkFailedOutcome, RepositoryError>;

    /// 按状态统计消息数
    async fn count_by_status(&self, status: OutboxStatus) -> Result<u64, RepositoryError>;

    /// 删除指定时间之前已发布的消息，返回删除行数
    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;

    /// 根据ID查找消息
    async fn find_by_id(&self, id: Uuid) -> Result<Option<OutboxMessage>, RepositoryError>;

    /// 查找某个聚合的全部消息（诊断用）
    async fn find_by_aggregate_id(
        &self,
        aggregate_id: &str,
    ) -> Result<Vec<OutboxMessage>, RepositoryError>;
}
