//! 按来源的事件归一化（Transformer）
//!
//! 每个来源一个纯函数，把原始载荷转换为规范 `Event`：
//! - 类型取自来源的约定字段，或由 `TransformOptions::event_type` 覆盖；
//! - 标识按类型抽取（消息 ID、直播场次 ID、主体 ID），都不可用时生成新 ID；
//! - 时间戳解析失败时回退为当前时间；
//! - 未登记的来源或类型原样透传载荷。
//!
//! 所有入口均不会失败，也不会 panic。

mod fields;
mod ironmon;
mod obs;
mod timestamp;
mod twitch;

pub use ironmon::{CHECKPOINT, from_ironmon};
pub use obs::from_obs;
pub use timestamp::{extract_timestamp, parse_timestamp};
pub use twitch::{CHANNEL_SUBSCRIBE, CHANNEL_UPDATE, CHAT_MESSAGE, from_twitch};

use crate::event::{Event, EventMeta, EventSource, Priority};
use bon::Builder;
use chrono::{DateTime, Utc};
use fields::{generate_id, string_field};
use serde_json::Value;

/// 归一化选项
#[derive(Builder, Debug, Clone, Default)]
pub struct TransformOptions {
    /// 覆盖来源约定的事件类型
    #[builder(into)]
    event_type: Option<String>,
    /// 覆盖抽取出的事件标识
    #[builder(into)]
    id: Option<String>,
    #[builder(default)]
    priority: Priority,
    #[builder(into)]
    correlation_id: Option<String>,
    /// 已结构化的发生时间，优先于载荷中的时间字段
    timestamp: Option<DateTime<Utc>>,
}

/// 按来源分派归一化
pub fn normalize(
    source: &EventSource,
    raw_type: &str,
    payload: &Value,
    opts: &TransformOptions,
) -> Event {
    match source {
        EventSource::Twitch => from_twitch(raw_type, payload, opts),
        EventSource::Obs => from_obs(raw_type, payload, opts),
        EventSource::Ironmon => from_ironmon(raw_type, payload, opts),
        EventSource::Rainwave => from_rainwave(raw_type, payload, opts),
        EventSource::System => from_system(raw_type, payload, opts),
        EventSource::Test => from_test(raw_type, payload, opts),
        other => passthrough(other.clone(), raw_type.to_string(), payload, opts),
    }
}

/// 音乐服务（Rainwave）：载荷原样透传
pub fn from_rainwave(raw_type: &str, payload: &Value, opts: &TransformOptions) -> Event {
    let event_type = prefixed_type("rainwave", raw_type);
    passthrough(EventSource::Rainwave, event_type, payload, opts)
}

/// 系统内部事件：载荷原样透传
pub fn from_system(raw_type: &str, payload: &Value, opts: &TransformOptions) -> Event {
    let event_type = prefixed_type("system", raw_type);
    passthrough(EventSource::System, event_type, payload, opts)
}

pub fn from_test(raw_type: &str, payload: &Value, opts: &TransformOptions) -> Event {
    passthrough(EventSource::Test, raw_type.to_string(), payload, opts)
}

fn passthrough(
    source: EventSource,
    default_type: String,
    payload: &Value,
    opts: &TransformOptions,
) -> Event {
    let event_type = opts.event_type.clone().unwrap_or(default_type);
    let id = opts
        .id
        .clone()
        .or_else(|| string_field(payload, "id"))
        .unwrap_or_else(generate_id);

    assemble(source, event_type, id, payload, payload.clone(), opts)
}

/// `StreamStarted` -> `obs.StreamStarted`，已带前缀的类型保持不变
pub(crate) fn prefixed_type(prefix: &str, raw_type: &str) -> String {
    let raw_type = raw_type.trim();
    if raw_type.is_empty() {
        return format!("{prefix}.unknown");
    }
    match raw_type.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('.') => raw_type.to_string(),
        _ => format!("{prefix}.{raw_type}"),
    }
}

/// 组装最终事件：类型为空时记为 `unknown`，时间戳优先取选项中的结构化值
pub(crate) fn assemble(
    source: EventSource,
    event_type: String,
    id: String,
    payload: &Value,
    data: Value,
    opts: &TransformOptions,
) -> Event {
    let event_type = if event_type.trim().is_empty() {
        "unknown".to_string()
    } else {
        event_type
    };

    let timestamp = opts
        .timestamp
        .unwrap_or_else(|| extract_timestamp(payload));

    let meta = EventMeta::builder()
        .priority(opts.priority)
        .maybe_correlation_id(opts.correlation_id.clone())
        .processed_at(Utc::now())
        .build();

    Event::builder()
        .id(id)
        .event_type(event_type)
        .source(source)
        .timestamp(timestamp)
        .data(data)
        .meta(meta)
        .build()
}

/// 事件形态检查的发现项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyId,
    EmptyType,
    NonObjectData,
}

/// 检查事件形态；归一化不会因此失败，调用方仅用于记录
pub fn validate(event: &Event) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if event.id().trim().is_empty() {
        issues.push(ValidationIssue::EmptyId);
    }
    if event.event_type().trim().is_empty() {
        issues.push(ValidationIssue::EmptyType);
    }
    if !event.data().is_object() {
        issues.push(ValidationIssue::NonObjectData);
    }
    issues
}
