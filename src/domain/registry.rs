// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// 可被Outbox跟踪的聚合根能力
///
/// 聚合根实现此特质后即可参与捕获：提供聚合ID、类型名以及可选的
/// 自定义负载投影。未提供投影时整个聚合会被序列化为事件负载。
pub trait OutboxAggregate: Serialize {
    /// 聚合类型名，默认取类型的短名称
    fn aggregate_type() -> &'static str
    where
        Self: Sized,
    {
        let name = std::any::type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name)
    }

    /// 聚合根标识符
    ///
    /// 返回None时捕获层会退回到序列化后负载中的常规ID字段
    fn aggregate_id(&self) -> Option<String> {
        None
    }

    /// 自定义负载投影
    fn outbox_payload(&self) -> Option<serde_json::Value> {
        None
    }
}

/// 单个聚合类型的跟踪配置
///
/// 空字符串表示按约定派生（类型名 / `TYPE_INSERT` / `TYPE_UPDATE`）
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// 更新时是否跟踪变更字段
    pub include_changed_fields: bool,
    /// 事件类型覆盖
    pub event_type: String,
    /// 聚合类型覆盖
    pub aggregate_type: String,
    /// 重试预算
    pub max_retries: i32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            include_changed_fields: false,
            event_type: String::new(),
            aggregate_type: String::new(),
            max_retries: 3,
        }
    }
}

impl AggregateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_changed_fields(mut self, include: bool) -> Self {
        self.include_changed_fields = include;
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = aggregate_type.into();
        self
    }

    pub fn max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// 注册时解析完成的聚合元数据
///
/// 捕获热路径上只做一次Map查找，派生名称均在注册时算好
#[derive(Debug)]
pub struct AggregateMetadata {
    pub aggregate_type: String,
    pub insert_event_type: String,
    pub update_event_type: String,
    pub include_changed_fields: bool,
    pub max_retries: i32,
}

impl AggregateMetadata {
    /// 按操作取事件类型
    pub fn event_type(&self, operation: Operation) -> &str {
        match operation {
            Operation::Insert => &self.insert_event_type,
            Operation::Update => &self.update_event_type,
        }
    }
}

/// 捕获操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
        }
    }
}

/// 聚合注册表
///
/// 记录哪些聚合类型参与Outbox跟踪及其配置。读多写少，
/// 使用DashMap保证无锁读取
#[derive(Debug, Default)]
pub struct OutboxRegistry {
    metadata: DashMap<&'static str, Arc<AggregateMetadata>>,
}

impl OutboxRegistry {
    pub fn new() -> Self {
        Self {
            metadata: DashMap::new(),
        }
    }

    /// 注册一个聚合类型
    ///
    /// 重复注册保持首次配置不变
    pub fn register<A: OutboxAggregate>(&self, config: AggregateConfig) {
        let type_name = A::aggregate_type();

        self.metadata.entry(type_name).or_insert_with(|| {
            let aggregate_type = if config.aggregate_type.is_empty() {
                type_name.to_string()
            } else {
                config.aggregate_type.clone()
            };

            let (insert_event_type, update_event_type) = if config.event_type.is_empty() {
                let upper = type_name.to_uppercase();
                (format!("{}_INSERT", upper), format!("{}_UPDATE", upper))
            } else {
                (config.event_type.clone(), config.event_type.clone())
            };

            Arc::new(AggregateMetadata {
                aggregate_type,
                insert_event_type,
                update_event_type,
                include_changed_fields: config.include_changed_fields,
                max_retries: config.max_retries,
            })
        });
    }

    /// 按类型名查找元数据
    pub fn lookup(&self, type_name: &str) -> Option<Arc<AggregateMetadata>> {
        self.metadata
            .get(type_name)
            .map(|entry| entry.value().clone())
    }

    /// 按聚合类型查找元数据
    pub fn lookup_for<A: OutboxAggregate>(&self) -> Option<Arc<AggregateMetadata>> {
        self.lookup(A::aggregate_type())
    }

    /// 是否已注册
    pub fn is_tracked<A: OutboxAggregate>(&self) -> bool {
        self.metadata.contains_key(A::aggregate_type())
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
