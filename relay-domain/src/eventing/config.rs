//! 运行时配置
//!
//! 由应用层在启动时加载（文件、环境变量），这里只定义结构、默认值与校验。
//!
use crate::error::{DomainError, DomainResult};
use crate::transform::{CHANNEL_SUBSCRIBE, CHANNEL_UPDATE, CHAT_MESSAGE, CHECKPOINT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// 路由器配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// 进入批处理的事件类型，可为空
    pub batchable_types: BTreeSet<String>,
    /// 立即投递时会调用专属处理器的事件类型
    pub handled_types: BTreeSet<String>,
    /// 命令队列容量
    pub mailbox_capacity: usize,
    /// 同时运行的处理器调用上限，达到上限时跳过新的调用
    pub max_inflight_handlers: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            batchable_types: BTreeSet::new(),
            handled_types: [CHAT_MESSAGE, CHANNEL_SUBSCRIBE, CHANNEL_UPDATE, CHECKPOINT]
                .into_iter()
                .map(str::to_string)
                .collect(),
            mailbox_capacity: 1024,
            max_inflight_handlers: 256,
        }
    }
}

/// 关闭时对尚未冲刷事件的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// 最后冲刷一次，之后不再发布
    #[default]
    Flush,
    /// 直接丢弃并记录数量
    Discard,
}

/// 批处理收集器配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// 定时冲刷周期（毫秒）
    pub batch_window_ms: u64,
    /// 单个批次的最大事件数，同时也是按来源立即冲刷的阈值
    pub max_batch_size: usize,
    /// 所有来源合计的缓冲上限，超过后拒收新事件
    pub max_buffer_events: usize,
    /// 命令队列容量
    pub mailbox_capacity: usize,
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_window_ms: 100,
            max_batch_size: 50,
            max_buffer_events: 10_000,
            mailbox_capacity: 1024,
            shutdown_policy: ShutdownPolicy::Flush,
        }
    }
}

impl BatchConfig {
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }
}

/// 管线配置
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub router: RouterConfig,
    pub batch: BatchConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if self.batch.batch_window_ms == 0 {
            return Err(DomainError::invalid_config("batch.batch_window_ms must be > 0"));
        }
        let positive = [
            ("batch.max_batch_size", self.batch.max_batch_size),
            ("batch.max_buffer_events", self.batch.max_buffer_events),
            ("batch.mailbox_capacity", self.batch.mailbox_capacity),
            ("router.mailbox_capacity", self.router.mailbox_capacity),
            ("router.max_inflight_handlers", self.router.max_inflight_handlers),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DomainError::invalid_config(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_cover_interesting_types() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.router.batchable_types.is_empty());
        assert!(config.router.handled_types.contains("channel.chat.message"));
        assert!(config.router.handled_types.contains("ironmon.checkpoint"));
        assert_eq!(config.batch.batch_window(), Duration::from_millis(100));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let config = PipelineConfig {
            batch: BatchConfig {
                max_batch_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch.max_batch_size"));
    }

    #[test]
    fn window_is_checked_without_narrowing() {
        let mut config = PipelineConfig::default();
        config.batch.batch_window_ms = 1 << 32;
        assert!(config.validate().is_ok());

        config.batch.batch_window_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch.batch_window_ms"));
    }

    #[test]
    fn zero_inflight_handlers_is_rejected() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.router.max_inflight_handlers, 256);
        config.router.max_inflight_handlers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("router.max_inflight_handlers"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"router": {"batchable_types": ["channel.chat.message"]},
                "batch": {"max_batch_size": 3, "shutdown_policy": "discard"}}"#,
        )
        .unwrap();

        assert!(config.router.batchable_types.contains("channel.chat.message"));
        assert_eq!(config.router.mailbox_capacity, 1024);
        assert_eq!(config.batch.max_batch_size, 3);
        assert_eq!(config.batch.batch_window_ms, 100);
        assert_eq!(config.batch.shutdown_policy, ShutdownPolicy::Discard);
    }
}
