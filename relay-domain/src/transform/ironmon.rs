//! 游戏遥测（IronMON）归一化
//!
use super::fields::{generate_id, string_field};
use super::{TransformOptions, assemble, prefixed_type};
use crate::event::{Event, EventSource};
use serde_json::Value;

pub const CHECKPOINT: &str = "ironmon.checkpoint";

pub fn from_ironmon(raw_type: &str, payload: &Value, opts: &TransformOptions) -> Event {
    let event_type = opts
        .event_type
        .clone()
        .unwrap_or_else(|| prefixed_type("ironmon", raw_type));

    let id = opts
        .id
        .clone()
        .or_else(|| string_field(payload, "id"))
        .unwrap_or_else(generate_id);

    assemble(
        EventSource::Ironmon,
        event_type,
        id,
        payload,
        flatten_metadata(payload),
        opts,
    )
}

/// 将 `metadata` 子对象提升到顶层，顶层已有字段优先
fn flatten_metadata(payload: &Value) -> Value {
    let Some(obj) = payload.as_object() else {
        return payload.clone();
    };
    let mut data = obj.clone();
    if let Some(Value::Object(metadata)) = data.get("metadata").cloned() {
        data.remove("metadata");
        for (key, value) in metadata {
            data.entry(key).or_insert(value);
        }
    }
    Value::Object(data)
}
