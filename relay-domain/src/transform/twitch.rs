//! 聊天平台（Twitch EventSub）归一化
//!
use super::fields::{actor_derived_id, first_string_field, generate_id, rename_keys, string_field};
use super::{TransformOptions, assemble};
use crate::event::{Event, EventSource};
use serde::Serialize;
use serde_json::{Map, Value};

pub const CHAT_MESSAGE: &str = "channel.chat.message";
pub const CHANNEL_SUBSCRIBE: &str = "channel.subscribe";
pub const CHANNEL_UPDATE: &str = "channel.update";

/// 以平台消息 ID 作为事件标识的类型
const MESSAGE_TYPES: &[&str] = &[
    CHAT_MESSAGE,
    "channel.chat.notification",
    "channel.chat.message_delete",
    "user.whisper.message",
];

/// 以直播场次 ID 作为事件标识的类型
const STREAM_TYPES: &[&str] = &["stream.online", "stream.offline"];

/// 主体字段，按优先级排列
const ACTOR_FIELDS: &[&str] = &["user_id", "chatter_user_id", "from_broadcaster_user_id"];

/// 结构化表情
#[derive(Debug, Clone, PartialEq, Serialize)]
struct Emote {
    id: String,
    name: String,
    formats: Vec<String>,
}

pub fn from_twitch(raw_type: &str, payload: &Value, opts: &TransformOptions) -> Event {
    let event_type = opts
        .event_type
        .clone()
        .unwrap_or_else(|| raw_type.to_string());

    let id = opts
        .id
        .clone()
        .unwrap_or_else(|| extract_id(&event_type, payload));

    let data = match event_type.as_str() {
        CHAT_MESSAGE | "channel.chat.notification" => normalize_chat_message(payload),
        t if STREAM_TYPES.contains(&t) => rename_keys(payload, |key| match key {
            "id" => Some("stream_id".to_string()),
            "type" => Some("stream_type".to_string()),
            _ => None,
        }),
        "channel.raid" => rename_keys(payload, |key| {
            if let Some(rest) = key.strip_prefix("from_broadcaster_user_") {
                Some(format!("raider_user_{rest}"))
            } else {
                key.strip_prefix("to_broadcaster_user_")
                    .map(|rest| format!("broadcaster_user_{rest}"))
            }
        }),
        _ => payload.clone(),
    };

    assemble(EventSource::Twitch, event_type, id, payload, data, opts)
}

fn extract_id(event_type: &str, payload: &Value) -> String {
    let provided = if MESSAGE_TYPES.contains(&event_type) {
        string_field(payload, "message_id")
    } else if STREAM_TYPES.contains(&event_type) {
        string_field(payload, "id")
    } else {
        None
    };

    provided
        .or_else(|| first_string_field(payload, ACTOR_FIELDS).map(|actor| actor_derived_id(&actor)))
        .unwrap_or_else(generate_id)
}

/// 将嵌套的 `message` 子对象（文本、颜色、徽章）提升到顶层，并抽取表情
fn normalize_chat_message(payload: &Value) -> Value {
    let Some(obj) = payload.as_object() else {
        return payload.clone();
    };

    let mut data: Map<String, Value> = obj.clone();
    let message = data.remove("message").unwrap_or(Value::Null);

    let text = match &message {
        Value::String(s) => s.clone(),
        other => other
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    };

    let fragments: Vec<Value> = message
        .get("fragments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let color = message
        .get("color")
        .or_else(|| obj.get("color"))
        .cloned()
        .unwrap_or(Value::Null);

    let badges = message
        .get("badges")
        .or_else(|| obj.get("badges"))
        .filter(|b| b.is_array())
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    let emotes = extract_emotes(&message, &fragments);
    let native_emotes = native_emotes(&fragments);

    data.insert("text".into(), Value::String(text));
    data.insert("color".into(), color);
    data.insert("badges".into(), badges);
    data.insert(
        "emotes".into(),
        serde_json::to_value(emotes).unwrap_or_else(|_| Value::Array(Vec::new())),
    );
    data.insert(
        "native_emotes".into(),
        Value::Array(native_emotes.into_iter().map(Value::String).collect()),
    );
    data.insert("fragments".into(), Value::Array(fragments));

    Value::Object(data)
}

/// 结构化表情列表：优先读取消息元数据中的 `emotes`，否则由带 `emote` 信息的片段推导
fn extract_emotes(message: &Value, fragments: &[Value]) -> Vec<Emote> {
    if let Some(listed) = message.get("emotes").and_then(Value::as_array) {
        return listed
            .iter()
            .filter_map(|e| {
                let id = string_field(e, "id")?;
                let name = first_string_field(e, &["name", "text"]).unwrap_or_default();
                let formats = string_list(e.get("formats").or_else(|| e.get("format")));
                Some(Emote { id, name, formats })
            })
            .collect();
    }

    fragments
        .iter()
        .filter(|f| is_emote_fragment(f))
        .filter_map(|f| {
            let emote = f.get("emote")?;
            Some(Emote {
                id: string_field(emote, "id")?,
                name: string_field(f, "text").unwrap_or_default(),
                formats: string_list(emote.get("format").or_else(|| emote.get("formats"))),
            })
        })
        .collect()
}

/// 片段中按出现顺序的表情文本，允许重复
fn native_emotes(fragments: &[Value]) -> Vec<String> {
    fragments
        .iter()
        .filter(|f| is_emote_fragment(f))
        .filter_map(|f| f.get("text").and_then(Value::as_str).map(str::to_string))
        .collect()
}

fn is_emote_fragment(fragment: &Value) -> bool {
    fragment.get("type").and_then(Value::as_str) == Some("emote")
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
