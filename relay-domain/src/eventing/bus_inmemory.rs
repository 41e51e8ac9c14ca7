//! 内存版事件总线（InMemoryEventBus）
//!
//! 主题名到 `tokio::sync::broadcast` 发送端的注册表：
//! - `publish`：向主题广播，无订阅者时返回 0，不视为错误；
//! - `subscribe`：按需创建主题并返回 `'static` 生命周期的订阅流；
//! - 每个主题的缓冲区容量固定，慢订阅者会收到 `DomainError::Lagged` 后继续消费。
//!
use crate::error::{DomainError, DomainResult as Result};
use crate::event::Delivery;
use crate::eventing::{EventBus, Topic};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

#[derive(Clone)]
pub struct InMemoryEventBus {
    topics: Arc<DashMap<String, broadcast::Sender<Delivery>>>,
    capacity: usize,
}

impl InMemoryEventBus {
    /// 创建一个内存总线，`capacity` 为每个主题的广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// 当前订阅某主题的接收端数量
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics
            .get(topic.as_str())
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn sender(&self, topic: &Topic) -> broadcast::Sender<Delivery> {
        self.topics
            .entry(topic.as_str().to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &Topic, delivery: Delivery) -> Result<usize> {
        let tx = self.topics.get(topic.as_str()).map(|tx| tx.clone());
        // 无订阅者时 broadcast 的 send 会返回错误，这里视为投递给 0 个订阅者
        Ok(tx.and_then(|tx| tx.send(delivery).ok()).unwrap_or(0))
    }

    async fn subscribe(&self, topic: &Topic) -> BoxStream<'static, Result<Delivery>> {
        let rx = self.sender(topic).subscribe();
        let stream = BroadcastStream::new(rx).map(|r| {
            r.map_err(|err| match err {
                BroadcastStreamRecvError::Lagged(skipped) => DomainError::Lagged { skipped },
                #[allow(unreachable_patterns)]
                other => DomainError::event_bus(other.to_string()),
            })
        });
        Box::pin(stream)
    }
}
