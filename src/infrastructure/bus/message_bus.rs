// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 发布错误类型
///
/// 中继将所有发布错误视为瞬时失败并计入重试预算
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Publish timeout")]
    Timeout,

    #[error("Message rejected by broker: {0}")]
    Rejected(String),
}

/// 消息总线特质
///
/// 定义中继对外部总线的最小契约。实现方负责自身的请求超时，
/// publish在broker确认后才返回
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// 发布一条消息并同步等待确认
    ///
    /// # 参数
    ///
    /// * `topic` - 目标主题
    /// * `key` - 分区键
    /// * `value` - UTF-8 JSON消息体
    async fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), PublishError>;
}
