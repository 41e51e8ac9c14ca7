//! 运行时装配
//!
//! 按配置创建内存总线与事件管线，并对外提供接入门面、订阅与健康快照。
//!
use crate::config::RelayConfig;
use crate::error::AppResult;
use crate::health::HealthReport;
use crate::ingest::IngestService;
use futures_util::stream::BoxStream;
use relay_domain::error::DomainResult;
use relay_domain::event::Delivery;
use relay_domain::eventing::{
    EventBus, EventHandler, EventPipeline, InMemoryEventBus, PipelineHandle, Topic,
};
use std::sync::Arc;

pub struct Relay {
    bus: Arc<InMemoryEventBus>,
    pipeline: PipelineHandle,
    ingest: IngestService,
}

impl Relay {
    pub fn start(config: &RelayConfig) -> AppResult<Self> {
        Self::start_with_handlers(config, Vec::new())
    }

    pub fn start_with_handlers(
        config: &RelayConfig,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> AppResult<Self> {
        config.validate()?;

        let bus = Arc::new(InMemoryEventBus::new(config.bus.topic_capacity));
        let pipeline = EventPipeline::builder()
            .event_bus(bus.clone())
            .event_handlers(handlers)
            .config(config.pipeline())
            .build()
            .start()?;
        let ingest = IngestService::new(pipeline.router().clone());

        tracing::info!(
            batchable_types = ?config.router.batchable_types,
            batch_window_ms = config.batch.batch_window_ms,
            topic_capacity = config.bus.topic_capacity,
            "relay started"
        );

        Ok(Self {
            bus,
            pipeline,
            ingest,
        })
    }

    pub fn ingest(&self) -> &IngestService {
        &self.ingest
    }

    pub fn pipeline(&self) -> &PipelineHandle {
        &self.pipeline
    }

    pub async fn subscribe(&self, topic: &Topic) -> BoxStream<'static, DomainResult<Delivery>> {
        self.bus.subscribe(topic).await
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.bus.subscriber_count(topic)
    }

    pub async fn health(&self) -> AppResult<HealthReport> {
        HealthReport::collect(self.pipeline.router(), self.pipeline.collector()).await
    }

    /// 先停路由器，再按关闭策略停收集器
    pub async fn shutdown(self) {
        self.pipeline.shutdown_gracefully().await;
    }
}
