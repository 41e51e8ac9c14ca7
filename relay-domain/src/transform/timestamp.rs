//! 时间戳解析
//!
//! 接受 ISO-8601 / RFC 3339 字符串、Unix 秒（整数、小数或数字字符串）；
//! 无法解析或缺失时回退为当前时间，此路径永不返回错误。
//!
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// 依次查找的时间字段
const TIMESTAMP_FIELDS: &[&str] = &[
    "timestamp",
    "occurred_at",
    "message_timestamp",
    "followed_at",
    "started_at",
    "ended_at",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 从载荷中提取事件发生时间，缺失或畸形时返回当前时间
pub fn extract_timestamp(payload: &Value) -> DateTime<Utc> {
    payload
        .as_object()
        .and_then(|obj| {
            TIMESTAMP_FIELDS
                .iter()
                .find_map(|key| obj.get(*key).and_then(parse_timestamp))
        })
        .unwrap_or_else(Utc::now)
}

/// 解析单个时间值
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_str(s),
        Value::Number(n) => match n.as_i64() {
            Some(secs) => DateTime::from_timestamp(secs, 0),
            None => n.as_f64().and_then(from_float_secs),
        },
        _ => None,
    }
}

fn parse_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // 无时区的 ISO 时间按 UTC 处理
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    raw.parse::<f64>().ok().and_then(from_float_secs)
}

fn from_float_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_timestamp(&json!("2024-05-01T14:00:00+02:00"));
        assert_eq!(parsed, Some(ts(2024, 5, 1, 12, 0, 0)));
    }

    #[test]
    fn parses_naive_iso_as_utc() {
        let parsed = parse_timestamp(&json!("2024-05-01T12:00:00.250"));
        assert_eq!(
            parsed.map(|d| d.timestamp_millis()),
            Some(ts(2024, 5, 1, 12, 0, 0).timestamp_millis() + 250)
        );
    }

    #[test]
    fn parses_epoch_seconds_in_any_numeric_form() {
        let expected = Some(ts(2024, 5, 1, 12, 0, 0));
        assert_eq!(parse_timestamp(&json!(1_714_564_800)), expected);
        assert_eq!(parse_timestamp(&json!("1714564800")), expected);
        assert_eq!(
            parse_timestamp(&json!(1_714_564_800.5)).map(|d| d.timestamp_millis()),
            Some(1_714_564_800_500)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp(&json!("yesterday-ish")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
        assert_eq!(parse_timestamp(&json!({"seconds": 1})), None);
        assert_eq!(parse_timestamp(&json!(i64::MAX)), None);
    }

    #[test]
    fn missing_or_malformed_falls_back_to_now() {
        let before = Utc::now();
        let a = extract_timestamp(&json!({"timestamp": "not a date"}));
        let b = extract_timestamp(&json!(null));
        let after = Utc::now();

        assert!(a >= before && a <= after);
        assert!(b >= before && b <= after);
    }

    #[test]
    fn searches_conventional_fields_in_order() {
        let payload = json!({
            "followed_at": "2024-05-01T12:00:00Z",
            "started_at": "2023-01-01T00:00:00Z"
        });
        assert_eq!(extract_timestamp(&payload), ts(2024, 5, 1, 12, 0, 0));
    }
}
