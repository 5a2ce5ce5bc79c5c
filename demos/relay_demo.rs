// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 端到端演示：捕获 -> 中继 -> 总线
//!
//! 使用内存SQLite与内存总线，演示User聚合的插入与更新
//! 如何经由Outbox到达消费端。
//!
//! ```bash
//! cargo run --example relay_demo
//! ```

use migration::{Migrator, MigratorTrait};
use outbox_relay::application::capture::OutboxCapture;
use outbox_relay::config::settings::Settings;
use outbox_relay::domain::registry::{AggregateConfig, OutboxRegistry};
use outbox_relay::example::user::{User, UserRepository};
use outbox_relay::infrastructure::bus::in_memory::InMemoryBus;
use outbox_relay::infrastructure::database::connection;
use outbox_relay::infrastructure::observability::metrics;
use outbox_relay::infrastructure::repositories::outbox_repo_impl::OutboxRepositoryImpl;
use outbox_relay::utils::telemetry;
use outbox_relay::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();
    metrics::describe_metrics();

    std::env::set_var("OUTBOX__DATABASE__URL", "sqlite::memory:");
    std::env::set_var("OUTBOX__DATABASE__MAX_CONNECTIONS", "1");
    std::env::set_var("OUTBOX__RELAY__POLLING_INTERVAL_MS", "200");
    let settings = Settings::new()?;
    info!("Configuration loaded, worker id {}", settings.relay.worker_id());

    let db = Arc::new(connection::create_pool(&settings.database).await?);
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    let registry = Arc::new(OutboxRegistry::new());
    registry.register::<User>(AggregateConfig::new().include_changed_fields(true));

    let capture = Arc::new(OutboxCapture::new(registry));
    let users = UserRepository::new(db.clone(), capture);

    let user = User::new(1, "jane@example.com", "J", "D");
    users.create(&user).await?;

    let old = users.find_by_id(1).await?.expect("user was just created");
    let mut renamed = old.clone();
    renamed.first_name = "Jane".to_string();
    users.update(&old, &renamed).await?;

    let repository = Arc::new(OutboxRepositoryImpl::new(db.clone()));
    let bus = Arc::new(InMemoryBus::new());

    let mut manager = WorkerManager::new();
    manager.start_from_settings(&settings, repository, bus.clone())?;

    // Give the relay a couple of poll cycles to drain the outbox
    tokio::time::sleep(Duration::from_millis(600)).await;
    manager.shutdown().await;

    for record in bus.published() {
        info!(
            "published topic={} key={} value={}",
            record.topic, record.key, record.value
        );
    }

    Ok(())
}
