// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::capture::{CaptureError, OutboxCapture};
use crate::domain::registry::OutboxAggregate;
use crate::infrastructure::database::entities::user as user_entity;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// 示例User聚合
///
/// 演示聚合如何接入Outbox跟踪：实现`OutboxAggregate`，
/// 提供聚合ID与自定义负载投影
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        id: i64,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl OutboxAggregate for User {
    fn aggregate_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    /// 自定义负载投影
    ///
    /// 控制事件负载中暴露的字段，而非序列化整个聚合
    fn outbox_payload(&self) -> Option<serde_json::Value> {
        Some(json!({
            "id": self.id,
            "email": self.email,
            "firstName": self.first_name,
            "lastName": self.last_name,
            "isActive": self.is_active,
            "createdAt": self.created_at.to_rfc3339(),
            "updatedAt": self.updated_at.map(|at| at.to_rfc3339()),
        }))
    }
}

/// User存取错误类型
#[derive(Error, Debug)]
pub enum UserStoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Outbox capture error: {0}")]
    Capture(#[from] CaptureError),
}

/// 示例User仓库
///
/// 每个写路径都在一个事务内完成业务行写入与Outbox捕获，
/// 两者要么一起提交要么一起回滚
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
    capture: Arc<OutboxCapture>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>, capture: Arc<OutboxCapture>) -> Self {
        Self { db, capture }
    }

    pub async fn create(&self, user: &User) -> Result<(), UserStoreError> {
        let txn = self.db.begin().await?;

        user_entity::Entity::insert(active_model_from(user))
            .exec(&txn)
            .await?;
        self.capture.capture_insert(&txn, user).await?;

        txn.commit().await?;
        Ok(())
    }

    /// 更新用户
    ///
    /// `old`是加载时留存的状态快照，交给捕获层做变更字段提取
    pub async fn update(&self, old: &User, user: &User) -> Result<(), UserStoreError> {
        let txn = self.db.begin().await?;

        user_entity::Entity::update(active_model_from(user))
            .exec(&txn)
            .await?;
        self.capture.capture_update(&txn, old, user).await?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserStoreError> {
        let model = user_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }
}

fn active_model_from(user: &User) -> user_entity::ActiveModel {
    user_entity::ActiveModel {
        id: Set(user.id),
        email: Set(user.email.clone()),
        first_name: Set(user.first_name.clone()),
        last_name: Set(user.last_name.clone()),
        is_active: Set(user.is_active),
        created_at: Set(user.created_at.into()),
        updated_at: Set(user.updated_at.map(Into::into)),
    }
}

impl From<user_entity::Model> for User {
    fn from(model: user_entity::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.map(Into::into),
        }
    }
}
