use super::{EventMeta, EventSource, Priority};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 规范化事件
///
/// 构造完成后不可变：字段全部私有，只暴露只读访问器。路由与批处理只转移所有权，
/// 从不在原处修改事件。
#[derive(Debug, Clone, Builder, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 事件唯一标识符
    #[builder(into, default = Uuid::new_v4().to_string())]
    id: String,
    /// 点分层级的事件类型，例如 `channel.follow`、`obs.StreamStarted`
    #[serde(rename = "type")]
    #[builder(into)]
    event_type: String,
    /// 来源标签
    source: EventSource,
    /// 事件发生时间
    #[builder(default = Utc::now())]
    timestamp: DateTime<Utc>,
    /// 生产方拥有的载荷，本层不解释其语义
    #[builder(default = Value::Object(Map::new()))]
    data: Value,
    #[builder(default)]
    meta: EventMeta,
}

impl Event {
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

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn meta(&self) -> &EventMeta {
        &self.meta
    }

    pub fn priority(&self) -> Priority {
        self.meta.priority()
    }

    pub fn is_critical(&self) -> bool {
        self.meta.is_critical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_fills_id_timestamp_and_meta() {
        let event = Event::builder()
            .event_type("channel.follow")
            .source(EventSource::Twitch)
            .build();

        assert!(!event.id().is_empty());
        assert_eq!(event.data(), &json!({}));
        assert_eq!(event.priority(), Priority::Normal);
        assert!(event.meta().batch_id().is_none());
    }

    #[test]
    fn serializes_with_canonical_field_names() {
        let event = Event::builder()
            .id("evt-1")
            .event_type("obs.StreamStarted")
            .source(EventSource::Obs)
            .data(json!({"output_active": true}))
            .meta(EventMeta::builder().priority(Priority::Critical).build())
            .build();

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], "evt-1");
        assert_eq!(value["type"], "obs.StreamStarted");
        assert_eq!(value["source"], "obs");
        assert_eq!(value["meta"]["priority"], "critical");
        assert!(value["meta"]["processed_at"].is_string());

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
