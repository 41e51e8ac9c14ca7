use super::{BatchEvent, Event};
use serde::Serialize;
use std::sync::Arc;

/// 总线上的投递单元
///
/// 事件体由 `Arc` 持有，向多个订阅者扇出时只复制指针。
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Delivery {
    Event(Arc<Event>),
    Batch(Arc<BatchEvent>),
}

impl Delivery {
    pub fn id(&self) -> &str {
        match self {
            Delivery::Event(e) => e.id(),
            Delivery::Batch(b) => b.id(),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            Delivery::Event(e) => e.event_type(),
            Delivery::Batch(b) => b.event_type(),
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Delivery::Event(e) => Some(e),
            Delivery::Batch(_) => None,
        }
    }

    pub fn as_batch(&self) -> Option<&BatchEvent> {
        match self {
            Delivery::Batch(b) => Some(b),
            Delivery::Event(_) => None,
        }
    }
}

impl From<Event> for Delivery {
    fn from(event: Event) -> Self {
        Delivery::Event(Arc::new(event))
    }
}

impl From<BatchEvent> for Delivery {
    fn from(batch: BatchEvent) -> Self {
        Delivery::Batch(Arc::new(batch))
    }
}
