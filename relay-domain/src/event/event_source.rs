use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// 事件来源标签
///
/// 已知来源为封闭集合，新来源通过 `Other` 承载，不需要修改枚举即可接入。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventSource {
    /// 聊天平台
    Twitch,
    /// 直播软件
    Obs,
    /// 系统内部事件
    System,
    /// 游戏遥测
    Ironmon,
    /// 音乐服务
    Rainwave,
    /// 测试来源
    Test,
    /// 未知来源；应通过 `EventSource::other` 或 `From<&str>` 构造以保持小写
    Other(String),
}

impl EventSource {
    /// 按标签构造，已知标签映射到对应变体，其余转为小写后存入 `Other`
    pub fn other(tag: impl AsRef<str>) -> Self {
        EventSource::from(tag.as_ref())
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventSource::Twitch => "twitch",
            EventSource::Obs => "obs",
            EventSource::System => "system",
            EventSource::Ironmon => "ironmon",
            EventSource::Rainwave => "rainwave",
            EventSource::Test => "test",
            EventSource::Other(tag) => tag,
        }
    }

    /// 规范化的小写标签，用于主题名、统计与序列化
    pub fn tag(&self) -> Cow<'_, str> {
        match self {
            EventSource::Other(tag) if tag.bytes().any(|b| b.is_ascii_uppercase()) => {
                Cow::Owned(tag.to_ascii_lowercase())
            }
            _ => Cow::Borrowed(self.as_str()),
        }
    }
}

impl From<&str> for EventSource {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "twitch" => EventSource::Twitch,
            "obs" => EventSource::Obs,
            "system" => EventSource::System,
            "ironmon" => EventSource::Ironmon,
            "rainwave" => EventSource::Rainwave,
            "test" => EventSource::Test,
            other => EventSource::Other(other.to_string()),
        }
    }
}

impl From<String> for EventSource {
    fn from(value: String) -> Self {
        EventSource::from(value.as_str())
    }
}

impl From<EventSource> for String {
    fn from(value: EventSource) -> Self {
        value.tag().into_owned()
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_parse_case_insensitively() {
        assert_eq!(EventSource::from("Twitch"), EventSource::Twitch);
        assert_eq!(EventSource::from(" OBS "), EventSource::Obs);
        assert_eq!(EventSource::from("rainwave"), EventSource::Rainwave);
    }

    #[test]
    fn unknown_tags_are_kept() {
        let source = EventSource::from("discord");
        assert_eq!(source, EventSource::Other("discord".into()));
        assert_eq!(source.as_str(), "discord");
        assert_eq!(serde_json::to_value(&source).unwrap(), "discord");
    }

    #[test]
    fn other_tags_are_lowercased() {
        assert_eq!(EventSource::other(" Discord "), EventSource::Other("discord".into()));
        assert_eq!(EventSource::other("TWITCH"), EventSource::Twitch);

        // 直接构造的大写标签在对外形式上同样是小写
        let raw = EventSource::Other("Discord".into());
        assert_eq!(raw.to_string(), "discord");
        assert_eq!(serde_json::to_value(&raw).unwrap(), "discord");
        let back: EventSource = serde_json::from_value(serde_json::to_value(&raw).unwrap()).unwrap();
        assert_eq!(back, EventSource::other("discord"));
    }
}
