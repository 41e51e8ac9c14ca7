//! 事件总线（EventBus）协议
//!
//! 进程内按主题名发布/订阅。路由器的立即路径与批处理收集器的批次路径都经由
//! 总线把结果扇出给当前订阅者（至多一次，无订阅者时发布即被丢弃）。
//!
use crate::error::DomainResult as Result;
use crate::event::{Delivery, EventSource};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::fmt;

/// 主题名
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub const ALL: &'static str = "events:all";
    pub const BATCHED: &'static str = "events:batched";

    /// 全部立即事件
    pub fn all() -> Self {
        Topic(Self::ALL.to_string())
    }

    /// 批次事件
    pub fn batched() -> Self {
        Topic(Self::BATCHED.to_string())
    }

    /// 按来源划分的立即事件，如 `events:twitch`
    pub fn source(source: &EventSource) -> Self {
        Topic(format!("events:{}", source.tag()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 事件总线：负责向主题分发投递单元并提供订阅流
#[async_trait]
pub trait EventBus: Send + Sync {
    /// 发布到单个主题，返回收到该投递的订阅者数量
    async fn publish(&self, topic: &Topic, delivery: Delivery) -> Result<usize>;

    /// 发布到多个主题；某个主题失败不影响其余主题
    async fn publish_many(&self, topics: &[Topic], delivery: Delivery) -> Vec<Result<usize>> {
        let mut results = Vec::with_capacity(topics.len());
        for topic in topics {
            results.push(self.publish(topic, delivery.clone()).await);
        }
        results
    }

    /// 返回一个 'static 生命周期的订阅流，便于在 tokio::spawn 中使用
    async fn subscribe(&self, topic: &Topic) -> BoxStream<'static, Result<Delivery>>;
}
