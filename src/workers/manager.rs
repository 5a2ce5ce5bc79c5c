// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::repositories::outbox_repository::OutboxRepository;
use crate::infrastructure::bus::message_bus::MessageBus;
use crate::infrastructure::repositories::outbox_repo_impl::OutboxRepositoryImpl;
use crate::utils::errors::WorkerError;
use crate::workers::cleanup_worker::CleanupWorker;
use crate::workers::relay_worker::RelayWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 工作管理器
///
/// 负责启动中继与清理工作器，并在收到关闭信号后
/// 通过取消令牌协同停机，等待工作器排空当前记录
pub struct WorkerManager {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// 共享的取消令牌
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 按配置装配并启动中继与清理工作器
    ///
    /// `relay.enabled`为false时不启动任何工作器
    pub fn start_from_settings<B>(
        &mut self,
        settings: &Settings,
        repository: Arc<OutboxRepositoryImpl>,
        bus: Arc<B>,
    ) -> Result<(), WorkerError>
    where
        B: MessageBus + 'static,
    {
        if !settings.relay.enabled {
            info!("Outbox relay disabled by configuration");
            return Ok(());
        }

        let relay = RelayWorker::new(
            repository.clone(),
            bus,
            settings.relay.worker_id(),
            settings.relay.batch_size,
            Duration::from_millis(settings.relay.polling_interval_ms),
            settings.kafka.topic_prefix.clone(),
            settings.kafka.dead_letter_topic.clone(),
        );
        self.start_relay(relay);

        let cleanup = CleanupWorker::new(
            repository,
            &settings.cleanup.cron,
            settings.cleanup.retention_days,
        )?;
        self.start_cleanup(cleanup);

        Ok(())
    }

    /// 启动中继工作器
    pub fn start_relay<R, B>(&mut self, worker: RelayWorker<R, B>)
    where
        R: OutboxRepository + 'static,
        B: MessageBus + 'static,
    {
        let cancel = self.cancel.clone();
        // We spawn the worker loop on a separate task to avoid blocking the main thread
        let handle = tokio::spawn(async move {
            worker.run_loop(cancel).await;
        });
        self.handles.push(handle);
    }

    /// 启动清理工作器
    pub fn start_cleanup<R>(&mut self, worker: CleanupWorker<R>)
    where
        R: OutboxRepository + 'static,
    {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            worker.run_loop(cancel).await;
        });
        self.handles.push(handle);
    }

    /// 等待关闭信号并关闭工作进程
    ///
    /// 监听关闭信号并优雅地关闭所有工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        self.shutdown().await;
    }

    /// 取消所有工作器并等待退出
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        self.cancel.cancel();

        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }

        info!("Workers shut down successfully");
    }
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new()
    }
}
