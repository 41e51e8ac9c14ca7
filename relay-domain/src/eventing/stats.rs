//! 统计快照
//!
//! 计数器由各自的协调者独占并在命令循环内更新，对外只提供快照副本。
//!
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// 路由器统计
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouterStats {
    pub events_routed: u64,
    pub critical_events: u64,
    pub events_immediate: u64,
    pub events_batched: u64,
    pub publish_failures: u64,
    pub handler_failures: u64,
    /// 因并发上限被跳过的处理器调用
    pub handler_skipped: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_source: BTreeMap<String, u64>,
    /// 本轮统计的起点（启动或上次重置）
    pub since: DateTime<Utc>,
}

impl RouterStats {
    pub(crate) fn new() -> Self {
        Self {
            since: Utc::now(),
            ..Default::default()
        }
    }
}

/// 单个来源的批处理计数
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounters {
    pub added: u64,
    pub batched: u64,
    pub dropped: u64,
    pub buffered: u64,
}

/// 批处理收集器统计
///
/// 守恒关系（全局与每个来源均成立）：`added == batched + dropped + buffered`。
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub events_added: u64,
    pub batches_created: u64,
    pub events_batched: u64,
    pub events_dropped: u64,
    pub empty_flushes: u64,
    pub publish_failures: u64,
    /// 当前缓冲深度（所有来源合计）
    pub buffered: u64,
    pub by_source: BTreeMap<String, SourceCounters>,
    pub since: DateTime<Utc>,
}

impl BatchStats {
    /// 检查守恒关系
    pub fn is_conserved(&self) -> bool {
        self.events_added == self.events_batched + self.events_dropped + self.buffered
            && self
                .by_source
                .values()
                .all(|c| c.added == c.batched + c.dropped + c.buffered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservation_checks_every_source() {
        let mut stats = BatchStats {
            events_added: 3,
            events_batched: 1,
            events_dropped: 1,
            buffered: 1,
            ..Default::default()
        };
        stats.by_source.insert(
            "twitch".into(),
            SourceCounters {
                added: 3,
                batched: 1,
                dropped: 1,
                buffered: 1,
            },
        );
        assert!(stats.is_conserved());

        stats.by_source.get_mut("twitch").unwrap().buffered = 0;
        assert!(!stats.is_conserved());
    }
}
