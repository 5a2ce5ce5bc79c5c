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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use uuid::Uuid;

/// 应用程序配置设置
///
/// 包含数据库、中继、Kafka主题与清理等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 中继配置
    pub relay: RelaySettings,
    /// Kafka主题配置
    pub kafka: KafkaSettings,
    /// 清理配置
    pub cleanup: CleanupSettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 中继配置设置
#[derive(Debug, Deserialize)]
pub struct RelaySettings {
    /// 是否启用中继
    pub enabled: bool,
    /// 单次轮询的最大记录数
    pub batch_size: u64,
    /// 轮询间隔（毫秒）
    pub polling_interval_ms: u64,
    /// 工作器标识，缺省时在加载阶段生成随机UUID
    pub worker_id: Option<String>,
}

impl RelaySettings {
    /// 工作器标识
    ///
    /// 两个工作器绝不能共享同一标识
    pub fn worker_id(&self) -> String {
        self.worker_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

/// Kafka主题配置设置
#[derive(Debug, Deserialize)]
pub struct KafkaSettings {
    /// 信封主题前缀
    pub topic_prefix: String,
    /// 死信主题
    pub dead_letter_topic: String,
}

/// 清理配置设置
#[derive(Debug, Deserialize)]
pub struct CleanupSettings {
    /// 清理调度的cron表达式
    pub cron: String,
    /// SENT记录的保留天数
    pub retention_days: i64,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default DB pool settings
            .set_default("database.url", "postgres://localhost:5432/outbox")?
            .set_default("database.max_connections", 100)?
            .set_default("database.min_connections", 10)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default relay settings
            .set_default("relay.enabled", true)?
            .set_default("relay.batch_size", 100)?
            .set_default("relay.polling_interval_ms", 5000)?
            // Default topic settings
            .set_default("kafka.topic_prefix", "outbox.events")?
            .set_default("kafka.dead_letter_topic", "outbox.dead-letter")?
            // Default cleanup settings
            .set_default("cleanup.cron", "0 0 2 * * *")?
            .set_default("cleanup.retention_days", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("OUTBOX").separator("__"));

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if settings.relay.worker_id.is_none() {
            settings.relay.worker_id = Some(Uuid::new_v4().to_string());
        }

        Ok(settings)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
