use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 投递优先级：`Critical` 的事件始终立即投递
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Critical,
}

/// 事件元数据
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    #[builder(default)]
    priority: Priority,
    /// 关联ID
    correlation_id: Option<String>,
    /// 所属批次（仅批次事件本身携带）
    batch_id: Option<String>,
    /// 归一化完成时间
    #[builder(default = Utc::now())]
    processed_at: DateTime<Utc>,
}

impl EventMeta {
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_critical(&self) -> bool {
        self.priority == Priority::Critical
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn batch_id(&self) -> Option<&str> {
        self.batch_id.as_deref()
    }

    pub fn processed_at(&self) -> DateTime<Utc> {
        self.processed_at
    }
}

impl Default for EventMeta {
    fn default() -> Self {
        EventMeta::builder().build()
    }
}
