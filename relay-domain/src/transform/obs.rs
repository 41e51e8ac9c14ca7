//! 直播软件（OBS WebSocket）归一化
//!
use super::fields::{camel_to_snake, first_string_field, generate_id, rename_keys};
use super::{TransformOptions, assemble, prefixed_type};
use crate::event::{Event, EventSource};
use serde_json::Value;

const LIFECYCLE_TYPES: &[&str] = &[
    "obs.StreamStarted",
    "obs.StreamStopped",
    "obs.RecordingStarted",
    "obs.RecordingStopped",
];

pub fn from_obs(raw_type: &str, payload: &Value, opts: &TransformOptions) -> Event {
    let event_type = opts
        .event_type
        .clone()
        .unwrap_or_else(|| prefixed_type("obs", raw_type));

    let id = opts.id.clone().unwrap_or_else(|| {
        if LIFECYCLE_TYPES.contains(&event_type.as_str()) {
            first_string_field(payload, &["stream_id", "streamId"]).unwrap_or_else(generate_id)
        } else {
            generate_id()
        }
    });

    let data = rename_keys(payload, |key| {
        let snake = camel_to_snake(key);
        (snake != key).then_some(snake)
    });

    assemble(EventSource::Obs, event_type, id, payload, data, opts)
}
