//! 事件的下游视图
//!
//! - `TransportEvent`：推送给 UI 通道的精简视图，时间戳为 Unix 秒；
//! - `StoredEvent`：持久化视图，`data`/`meta` 以 JSON 字节存放，可反向还原为 `Event`。
//!
use super::{Event, EventMeta};
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 传输视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: i64,
}

impl Event {
    pub fn to_transport(&self) -> TransportEvent {
        TransportEvent {
            id: self.id().to_string(),
            event_type: self.event_type().to_string(),
            data: self.data().clone(),
            timestamp: self.timestamp().timestamp(),
        }
    }
}

/// 持久化视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: String,
    pub event_type: String,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub data: Vec<u8>,
    pub meta: Vec<u8>,
}

impl TryFrom<&Event> for StoredEvent {
    type Error = DomainError;

    fn try_from(event: &Event) -> DomainResult<Self> {
        Ok(StoredEvent {
            id: event.id().to_string(),
            event_type: event.event_type().to_string(),
            source: event.source().to_string(),
            occurred_at: event.timestamp(),
            processed_at: event.meta().processed_at(),
            data: serde_json::to_vec(event.data())?,
            meta: serde_json::to_vec(event.meta())?,
        })
    }
}

impl TryFrom<&StoredEvent> for Event {
    type Error = DomainError;

    fn try_from(stored: &StoredEvent) -> DomainResult<Self> {
        let data: Value = serde_json::from_slice(&stored.data)?;
        let meta: EventMeta = serde_json::from_slice(&stored.meta)?;

        Ok(Event::builder()
            .id(stored.id.clone())
            .event_type(stored.event_type.clone())
            .source(stored.source.as_str().into())
            .timestamp(stored.occurred_at)
            .data(data)
            .meta(meta)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventSource, Priority};
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Event {
        Event::builder()
            .id("msg-1")
            .event_type("channel.chat.message")
            .source(EventSource::Twitch)
            .timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
            .data(json!({"text": "hello"}))
            .meta(
                EventMeta::builder()
                    .priority(Priority::Critical)
                    .correlation_id("cor-1".to_string())
                    .build(),
            )
            .build()
    }

    #[test]
    fn transport_view_uses_epoch_seconds() {
        let transport = sample().to_transport();
        assert_eq!(transport.id, "msg-1");
        assert_eq!(transport.timestamp, 1_714_564_800);
        assert_eq!(transport.data, json!({"text": "hello"}));

        let value = serde_json::to_value(&transport).unwrap();
        assert_eq!(value["type"], "channel.chat.message");
    }

    #[test]
    fn stored_view_rehydrates_the_same_event() {
        let event = sample();
        let stored = StoredEvent::try_from(&event).unwrap();
        assert_eq!(stored.source, "twitch");
        assert_eq!(stored.processed_at, event.meta().processed_at());

        let back = Event::try_from(&stored).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn corrupt_stored_bytes_fail_to_rehydrate() {
        let mut stored = StoredEvent::try_from(&sample()).unwrap();
        stored.meta = b"not json".to_vec();
        assert!(matches!(
            Event::try_from(&stored),
            Err(DomainError::Serde { .. })
        ));
    }
}
