//! 载荷字段工具：标识符提取与字段改名
//!
use serde_json::{Map, Value};
use uuid::Uuid;

/// 生成新的唯一标识
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// 读取非空字符串（或数字）字段
pub fn string_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 第一个可用的主体（actor）字段
pub fn first_string_field(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string_field(payload, key))
}

/// 由主体标识派生事件标识；同一主体的多次行为仍需唯一，因此追加随机后缀
pub fn actor_derived_id(actor_id: &str) -> String {
    format!("{actor_id}:{}", Uuid::new_v4().simple())
}

/// 按映射函数改名顶层字段，非对象载荷原样返回
pub fn rename_keys<F>(payload: &Value, rename: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let Some(obj) = payload.as_object() else {
        return payload.clone();
    };

    let mut out = Map::with_capacity(obj.len());
    for (key, value) in obj {
        let key = rename(key).unwrap_or_else(|| key.clone());
        out.insert(key, value.clone());
    }
    Value::Object(out)
}

/// `sceneName` -> `scene_name`
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
