//! 事件管线（EventPipeline）
//!
//! 负责装配并监管两个长驻协调任务：
//! - 批处理收集器：按来源缓冲可批处理事件，定时/阈值/手动冲刷为批次事件；
//! - 路由器：判定立即或批处理，立即路径扇出并调用处理器。
//!
//! 关闭顺序：先停路由器（不再产生新的批处理输入），再停收集器（按关闭策略
//! 最后冲刷或丢弃）。
//!
use super::batch::{BatchCollector, BatchCollectorHandle};
use super::config::PipelineConfig;
use super::handler::{EventHandler, HandlerRegistry};
use super::router::{Router, RouterHandle};
use super::EventBus;
use crate::error::DomainResult;
use bon::Builder;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::event_pipeline_builder::{IsUnset, SetRegistry, State as BuilderState};

#[derive(Builder)]
pub struct EventPipeline {
    event_bus: Arc<dyn EventBus>,
    #[builder(default, setters(vis = "pub(crate)"))]
    registry: HandlerRegistry,
    #[builder(default)]
    config: PipelineConfig,
}

// 受 typestate 限制，`event_handlers` 只能在 `registry` 尚未设置时调用一次
impl<S: BuilderState> EventPipelineBuilder<S> {
    pub fn event_handlers(
        self,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> EventPipelineBuilder<SetRegistry<S>>
    where
        <S as BuilderState>::Registry: IsUnset,
    {
        self.registry(HandlerRegistry::new(handlers))
    }
}

impl EventPipeline {
    /// 校验配置并启动收集器与路由器
    pub fn start(self) -> DomainResult<PipelineHandle> {
        self.config.validate()?;

        let collector_token = CancellationToken::new();
        let router_token = CancellationToken::new();

        let (collector, collector_task) =
            BatchCollector::new(self.config.batch, self.event_bus.clone())
                .spawn(collector_token.clone());
        let (router, router_task) =
            Router::new(self.config.router, self.event_bus.clone(), collector.clone())
                .with_registry(self.registry)
                .spawn(router_token.clone());

        tracing::info!("event pipeline started");

        Ok(PipelineHandle {
            router,
            collector,
            bus: self.event_bus,
            router_token,
            collector_token,
            router_task: Some(router_task),
            collector_task: Some(collector_task),
        })
    }
}

/// 管线运行句柄：提供路由器与收集器的访问入口，并用于关闭与等待
pub struct PipelineHandle {
    router: RouterHandle,
    collector: BatchCollectorHandle,
    bus: Arc<dyn EventBus>,
    router_token: CancellationToken,
    collector_token: CancellationToken,
    router_task: Option<JoinHandle<()>>,
    collector_task: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn router(&self) -> &RouterHandle {
        &self.router
    }

    pub fn collector(&self) -> &BatchCollectorHandle {
        &self.collector
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    /// 同时通知两个协调任务退出，不等待
    pub fn shutdown(&self) {
        self.router_token.cancel();
        self.collector_token.cancel();
    }

    /// 按顺序关闭：等路由器退出后再关闭收集器，保证已交给收集器的事件按关闭策略处理
    pub async fn shutdown_gracefully(mut self) {
        self.router_token.cancel();
        if let Some(task) = self.router_task.take() {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "router task failed");
            }
        }

        self.collector_token.cancel();
        if let Some(task) = self.collector_task.take() {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "batch collector task failed");
            }
        }
        tracing::info!("event pipeline stopped");
    }

    /// 等待两个协调任务结束，返回异常退出（panic 或被中止）的任务数
    pub async fn join(mut self) -> usize {
        let tasks = [
            ("router", self.router_task.take()),
            ("batch collector", self.collector_task.take()),
        ];
        let mut failed = 0;
        for (name, task) in tasks {
            let Some(task) = task else { continue };
            if let Err(err) = task.await {
                failed += 1;
                tracing::error!(task = name, error = %err, "pipeline task failed");
            }
        }
        failed
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
