//! 接入门面（IngestService）
//!
//! 生产端适配器只需提供来源、原始类型与载荷，归一化与路由都在这里完成。
//! 形态异常的事件只记录告警，仍然照常路由。
//!
use crate::error::AppResult;
use relay_domain::event::{EventSource, Priority};
use relay_domain::eventing::{RouteAck, RouterHandle};
use relay_domain::transform::{self, TransformOptions};
use serde::Deserialize;
use serde_json::Value;

/// 一条原始输入，如 NDJSON 的一行：`{"source": "twitch", "type": "...", "payload": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRecord {
    pub source: EventSource,
    #[serde(rename = "type")]
    pub raw_type: String,
    #[serde(default = "empty_object")]
    pub payload: Value,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[derive(Clone)]
pub struct IngestService {
    router: RouterHandle,
}

impl IngestService {
    pub fn new(router: RouterHandle) -> Self {
        Self { router }
    }

    /// 归一化并路由；从不失败，只返回路由回执
    pub async fn ingest(
        &self,
        source: &EventSource,
        raw_type: &str,
        payload: &Value,
        opts: &TransformOptions,
    ) -> RouteAck {
        let event = transform::normalize(source, raw_type, payload, opts);

        let issues = transform::validate(&event);
        if !issues.is_empty() {
            tracing::warn!(
                event_id = event.id(),
                event_type = event.event_type(),
                source = %event.source(),
                ?issues,
                "normalized event has an unexpected shape"
            );
        }

        self.router.route(event).await
    }

    pub async fn ingest_record(&self, record: IngestRecord) -> RouteAck {
        let opts = TransformOptions::builder()
            .priority(record.priority)
            .maybe_correlation_id(record.correlation_id)
            .build();
        self.ingest(&record.source, &record.raw_type, &record.payload, &opts)
            .await
    }

    /// 解析一行 JSON 后接入；只有解析失败会返回错误
    pub async fn ingest_line(&self, line: &str) -> AppResult<RouteAck> {
        let record: IngestRecord =
            serde_json::from_str(line).map_err(relay_domain::error::DomainError::from)?;
        Ok(self.ingest_record(record).await)
    }
}
