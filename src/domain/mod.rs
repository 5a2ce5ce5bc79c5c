// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：Outbox消息、事件信封等核心实体
/// - 注册表（registry）：聚合类型的跟踪配置与元数据
/// - 仓库接口（repositories）：数据持久化抽象接口
///
/// 领域层是系统的核心，不依赖于任何外部实现，
/// 体现了纯粹的业务逻辑和业务规则。
pub mod models;
pub mod registry;
pub mod repositories;
