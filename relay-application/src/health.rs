//! 健康与遥测快照
//!
use crate::error::AppResult;
use relay_domain::eventing::{BatchCollectorHandle, BatchStats, RouterHandle, RouterStats};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    /// 出现过丢弃或失败，但协调任务仍在运行
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub router: RouterStats,
    pub batch: BatchStats,
}

impl HealthReport {
    pub async fn collect(
        router: &RouterHandle,
        collector: &BatchCollectorHandle,
    ) -> AppResult<Self> {
        let router = router.get_stats().await?;
        let batch = collector.get_stats().await?;
        Ok(Self::from_stats(router, batch))
    }

    pub fn from_stats(router: RouterStats, batch: BatchStats) -> Self {
        let degraded = router.publish_failures > 0
            || router.handler_failures > 0
            || router.handler_skipped > 0
            || batch.events_dropped > 0
            || batch.publish_failures > 0
            || !batch.is_conserved();
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self {
            status,
            router,
            batch,
        }
    }
}
