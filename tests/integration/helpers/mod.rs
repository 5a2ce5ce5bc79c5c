// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use migration::{Migrator, MigratorTrait};
use outbox_relay::application::capture::OutboxCapture;
use outbox_relay::domain::registry::{AggregateConfig, OutboxRegistry};
use outbox_relay::example::user::{User, UserRepository};
use outbox_relay::infrastructure::bus::in_memory::InMemoryBus;
use outbox_relay::infrastructure::repositories::outbox_repo_impl::OutboxRepositoryImpl;
use outbox_relay::workers::relay_worker::RelayWorker;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;

/// 测试环境
///
/// 一套内存数据库加内存总线的完整装配
pub struct TestHarness {
    pub db: Arc<DatabaseConnection>,
    pub repository: Arc<OutboxRepositoryImpl>,
    pub bus: Arc<InMemoryBus>,
    pub capture: Arc<OutboxCapture>,
    pub users: UserRepository,
}

impl TestHarness {
    pub async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let db = Arc::new(db);
        Migrator::up(db.as_ref(), None).await.unwrap();

        let registry = Arc::new(OutboxRegistry::new());
        registry.register::<User>(AggregateConfig::new().include_changed_fields(true));

        let capture = Arc::new(OutboxCapture::new(registry));
        let repository = Arc::new(OutboxRepositoryImpl::new(db.clone()));
        let bus = Arc::new(InMemoryBus::new());
        let users = UserRepository::new(db.clone(), capture.clone());

        Self {
            db,
            repository,
            bus,
            capture,
            users,
        }
    }

    /// 构建一个指向本环境的中继工作器
    pub fn relay_worker(&self, worker_id: &str) -> RelayWorker<OutboxRepositoryImpl, InMemoryBus> {
        RelayWorker::new(
            self.repository.clone(),
            self.bus.clone(),
            worker_id.to_string(),
            100,
            Duration::from_millis(50),
            "outbox.events".to_string(),
            "outbox.dead-letter".to_string(),
        )
    }
}
