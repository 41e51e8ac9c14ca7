//! 路由器（Router）
//!
//! 事件进入系统的唯一入口。对每个事件按顺序判定：
//! 1. 关键优先级：立即投递（无论类型是否可批处理）；
//! 2. 类型属于可批处理集合：交给批处理收集器，不做立即广播；
//! 3. 其余：立即投递。
//!
//! 立即投递把原样事件发布到 `events:all` 与 `events:<source>`，并对少数关注的
//! 类型在独立任务中调用处理器。同时运行的处理器调用受 `max_inflight_handlers`
//! 限制，超出时跳过并计数。统计计数器只在命令循环内更新。
//!
use super::batch::BatchCollectorHandle;
use super::config::RouterConfig;
use super::handler::{EventHandler, HandlerRegistry};
use super::stats::RouterStats;
use super::{EventBus, Topic};
use crate::error::{DomainError, DomainResult};
use crate::event::{Delivery, Event};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// `route` 的回执：只表示是否进入了路由器的命令队列
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteAck {
    Accepted,
    Closed,
}

impl RouteAck {
    pub fn is_accepted(self) -> bool {
        matches!(self, RouteAck::Accepted)
    }
}

enum RouterCommand {
    Route(Event),
    Stats(oneshot::Sender<RouterStats>),
    ResetStats(oneshot::Sender<()>),
    HandlerFailed {
        handler: String,
        event_type: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<RouterCommand>,
}

impl RouterHandle {
    /// 提交事件；只等待命令队列的空位，不等待投递
    pub async fn route(&self, event: Event) -> RouteAck {
        match self.tx.send(RouterCommand::Route(event)).await {
            Ok(()) => RouteAck::Accepted,
            Err(mpsc::error::SendError(cmd)) => {
                if let RouterCommand::Route(event) = cmd {
                    tracing::debug!(event_id = event.id(), "router stopped, event discarded");
                }
                RouteAck::Closed
            }
        }
    }

    pub async fn get_stats(&self) -> DomainResult<RouterStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RouterCommand::Stats(reply))
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn reset_stats(&self) -> DomainResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RouterCommand::ResetStats(reply))
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn stopped() -> DomainError {
    DomainError::CoordinatorStopped { name: "router" }
}

pub struct Router {
    config: RouterConfig,
    bus: Arc<dyn EventBus>,
    collector: BatchCollectorHandle,
    registry: HandlerRegistry,
    inflight: Arc<Semaphore>,
    stats: RouterStats,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        bus: Arc<dyn EventBus>,
        collector: BatchCollectorHandle,
    ) -> Self {
        let inflight = Arc::new(Semaphore::new(config.max_inflight_handlers.max(1)));
        Self {
            config,
            bus,
            collector,
            registry: HandlerRegistry::default(),
            inflight,
            stats: RouterStats::new(),
        }
    }

    /// 注册关注类型的处理器
    pub fn with_handlers(self, handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        self.with_registry(HandlerRegistry::new(handlers))
    }

    pub(crate) fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// 启动命令循环，`token` 取消后丢弃队列中尚未处理的事件并退出
    pub fn spawn(self, token: CancellationToken) -> (RouterHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.mailbox_capacity.max(1));
        // 处理器任务只持有弱引用，不阻止路由器在所有句柄释放后退出
        let failures = tx.downgrade();
        let task = tokio::spawn(self.run(rx, failures, token));
        (RouterHandle { tx }, task)
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<RouterCommand>,
        failures: mpsc::WeakSender<RouterCommand>,
        token: CancellationToken,
    ) {
        tracing::info!(
            batchable_types = self.config.batchable_types.len(),
            handled_types = self.config.handled_types.len(),
            "router started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd, &failures).await,
                    None => break,
                },
            }
        }

        rx.close();
        let mut dropped = 0usize;
        while let Ok(cmd) = rx.try_recv() {
            if matches!(cmd, RouterCommand::Route(_)) {
                dropped += 1;
            }
        }
        tracing::info!(
            routed = self.stats.events_routed,
            dropped,
            "router stopped"
        );
    }

    async fn handle(&mut self, cmd: RouterCommand, failures: &mpsc::WeakSender<RouterCommand>) {
        match cmd {
            RouterCommand::Route(event) => self.route(event, failures).await,
            RouterCommand::Stats(reply) => {
                let _ = reply.send(self.stats.clone());
            }
            RouterCommand::ResetStats(reply) => {
                self.stats = RouterStats::new();
                let _ = reply.send(());
            }
            RouterCommand::HandlerFailed {
                handler,
                event_type,
                reason,
            } => {
                self.stats.handler_failures += 1;
                tracing::warn!(handler = %handler, event_type = %event_type, reason = %reason, "event handler failed");
            }
        }
    }

    async fn route(&mut self, event: Event, failures: &mpsc::WeakSender<RouterCommand>) {
        self.stats.events_routed += 1;
        *self
            .stats
            .by_type
            .entry(event.event_type().to_string())
            .or_default() += 1;
        *self
            .stats
            .by_source
            .entry(event.source().to_string())
            .or_default() += 1;

        if event.is_critical() {
            self.stats.critical_events += 1;
        } else if self.config.batchable_types.contains(event.event_type()) {
            self.stats.events_batched += 1;
            tracing::debug!(event_id = event.id(), event_type = event.event_type(), "event batched");
            self.collector.add(event).await;
            return;
        }

        self.deliver(Arc::new(event), failures).await;
    }

    async fn deliver(&mut self, event: Arc<Event>, failures: &mpsc::WeakSender<RouterCommand>) {
        self.stats.events_immediate += 1;
        tracing::debug!(
            event_id = event.id(),
            event_type = event.event_type(),
            critical = event.is_critical(),
            "event delivered immediately"
        );

        let topics = [Topic::all(), Topic::source(event.source())];
        let results = self
            .bus
            .publish_many(&topics, Delivery::Event(event.clone()))
            .await;
        for (topic, result) in topics.iter().zip(results) {
            if let Err(err) = result {
                self.stats.publish_failures += 1;
                tracing::warn!(topic = %topic, event_id = event.id(), error = %err, "failed to publish event");
            }
        }

        self.dispatch(event, failures);
    }

    /// 在独立任务中调用处理器；失败经弱引用回报给命令循环计数
    ///
    /// 每个调用持有一个许可直到结束，没有空余许可时跳过该调用。
    fn dispatch(&mut self, event: Arc<Event>, failures: &mpsc::WeakSender<RouterCommand>) {
        if self.registry.is_empty() || !self.config.handled_types.contains(event.event_type()) {
            return;
        }

        for handler in self.registry.matching(event.event_type()) {
            let Ok(permit) = self.inflight.clone().try_acquire_owned() else {
                self.stats.handler_skipped += 1;
                tracing::warn!(
                    handler = handler.handler_name(),
                    event_id = event.id(),
                    limit = self.config.max_inflight_handlers,
                    "too many handler calls in flight, call skipped"
                );
                continue;
            };
            let event = event.clone();
            let failures = failures.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let Err(err) = handler.handle(&event).await else {
                    return;
                };
                let report = RouterCommand::HandlerFailed {
                    handler: handler.handler_name().to_string(),
                    event_type: event.event_type().to_string(),
                    reason: err.to_string(),
                };
                match failures.upgrade() {
                    Some(tx) => {
                        if tx.try_send(report).is_err() {
                            tracing::debug!(
                                handler = handler.handler_name(),
                                "router busy or stopped, handler failure not counted"
                            );
                        }
                    }
                    None => {
                        tracing::debug!(handler = handler.handler_name(), "handler failed after router stopped");
                    }
                }
            });
        }
    }
}
