use super::{Event, EventMeta, EventSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 批次事件的固定类型
pub const BATCH_EVENT_TYPE: &str = "event.batch";

/// 批次载荷：按到达顺序排列的事件与数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchData {
    pub events: Vec<Event>,
    pub count: usize,
}

/// 批次事件：一次冲刷（flush）中某个来源缓冲区被取出的事件集合
///
/// 序列化后与普通 `Event` 同形：`type = "event.batch"`、`source = "system"`，
/// 事件列表位于 `data.events`，批次号位于 `meta.batch_id`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    source: EventSource,
    timestamp: DateTime<Utc>,
    data: BatchData,
    meta: EventMeta,
    /// 被冲刷的缓冲区所属来源（不参与序列化，来源统一为 system）
    #[serde(skip)]
    origin: Option<EventSource>,
}

impl BatchEvent {
    /// 由一次冲刷取出的事件构造批次，`events` 必须保持到达顺序
    pub fn new(events: Vec<Event>, origin: EventSource) -> Self {
        let count = events.len();

        Self {
            id: Uuid::new_v4().to_string(),
            event_type: BATCH_EVENT_TYPE.to_string(),
            source: EventSource::System,
            timestamp: Utc::now(),
            data: BatchData { events, count },
            meta: EventMeta::builder()
                .batch_id(Uuid::new_v4().to_string())
                .build(),
            origin: Some(origin),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &EventSource {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn meta(&self) -> &EventMeta {
        &self.meta
    }

    pub fn batch_id(&self) -> &str {
        self.meta.batch_id().unwrap_or_default()
    }

    pub fn events(&self) -> &[Event] {
        &self.data.events
    }

    pub fn count(&self) -> usize {
        self.data.count
    }

    /// 批次内事件的原始来源
    pub fn origin(&self) -> Option<&EventSource> {
        self.origin.as_ref()
    }
}
