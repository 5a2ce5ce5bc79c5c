// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// 初始化指标系统
///
/// 安装Prometheus记录器并注册Outbox所需的各类监控指标。
/// 指标是能力而非依赖：未调用本函数时各计数宏静默无操作，
/// 核心流程不感知指标状态
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    builder
        .install()
        .expect("failed to install Prometheus recorder");

    describe_metrics();
}

/// 注册指标描述
///
/// 指标名是对外契约，消费端按名称建立看板与告警
pub fn describe_metrics() {
    describe_counter!(
        "outbox.messages.created",
        "Number of outbox messages created"
    );
    describe_counter!(
        "outbox.messages.processed",
        "Number of outbox messages processed by the relay"
    );
    describe_counter!(
        "outbox.creation.failures",
        "Number of outbox message creation failures"
    );
    describe_counter!("outbox.relay.polling", "Number of relay polling cycles");

    describe_gauge!(
        "outbox.messages.pending",
        "Current number of pending outbox messages"
    );
    describe_gauge!(
        "outbox.messages.failed",
        "Current number of failed outbox messages"
    );
    describe_gauge!(
        "outbox.messages.dead_letter",
        "Current number of dead-lettered outbox messages"
    );

    describe_histogram!(
        "outbox.processing.time",
        "Per-record publish latency in seconds"
    );
}
