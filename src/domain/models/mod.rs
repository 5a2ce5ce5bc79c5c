// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - Outbox消息（outbox_message）：与业务写入同事务落库的事件记录
/// - 事件信封（envelope）：发布到总线的线格式
pub mod envelope;
pub mod outbox_message;
