// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::bus::message_bus::{MessageBus, PublishError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 已发布记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    pub topic: String,
    pub key: String,
    pub value: String,
}

/// 内存消息总线
///
/// 测试与演示用总线实现：按序记录发布的消息，并可按需注入失败
#[derive(Debug, Default)]
pub struct InMemoryBus {
    records: Mutex<Vec<PublishedRecord>>,
    fail_all: AtomicBool,
    failing_topics: Mutex<HashSet<String>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全局开关：让后续publish全部失败
    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    /// 让指定主题的publish失败
    pub fn fail_topic(&self, topic: impl Into<String>) {
        self.failing_topics.lock().unwrap().insert(topic.into());
    }

    /// 已发布的全部记录
    pub fn published(&self) -> Vec<PublishedRecord> {
        self.records.lock().unwrap().clone()
    }

    /// 指定主题下已发布的记录
    pub fn published_on(&self, topic: &str) -> Vec<PublishedRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), PublishError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(PublishError::ConnectionFailed(
                "broker unavailable".to_string(),
            ));
        }

        if self.failing_topics.lock().unwrap().contains(topic) {
            return Err(PublishError::Rejected(format!(
                "topic {} rejects writes",
                topic
            )));
        }

        self.records.lock().unwrap().push(PublishedRecord {
            topic: topic.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });

        Ok(())
    }
}
