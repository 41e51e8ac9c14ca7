//! 批处理收集器（BatchCollector）
//!
//! 单写者协调任务，独占按来源划分的缓冲区与计数器，只能经由命令队列访问：
//! - `add`：缓冲未满时追加到事件来源的缓冲区，否则拒收新事件并计数（不淘汰旧事件）；
//! - 定时冲刷：每个窗口周期对每个非空来源取出至多 `max_batch_size` 个事件生成一个批次；
//! - 阈值冲刷：某来源缓冲达到 `max_batch_size` 时立即冲刷该来源；
//! - `flush_now`：立即执行同样的冲刷逻辑，缓冲全空时只计一次空冲刷；
//! - 关闭：按 `ShutdownPolicy` 最后冲刷或丢弃，之后不再发布。
//!
//! 所有变更都在同一个命令循环内串行执行，因此任意时刻至多一次冲刷，冲刷过程中
//! 也不会丢失并发的 `add`。
//!
use super::config::{BatchConfig, ShutdownPolicy};
use super::stats::{BatchStats, SourceCounters};
use super::{EventBus, Topic};
use crate::error::{DomainError, DomainResult};
use crate::event::{BatchEvent, Event, EventSource};
use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 一次冲刷的结果
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub batches: usize,
    pub events: usize,
}

impl FlushSummary {
    fn merge(&mut self, other: FlushSummary) {
        self.batches += other.batches;
        self.events += other.events;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FlushTrigger {
    Timer,
    Threshold,
    Manual,
    Shutdown,
}

impl FlushTrigger {
    fn as_str(self) -> &'static str {
        match self {
            FlushTrigger::Timer => "timer",
            FlushTrigger::Threshold => "threshold",
            FlushTrigger::Manual => "manual",
            FlushTrigger::Shutdown => "shutdown",
        }
    }
}

enum BatchCommand {
    Add(Event),
    Flush(oneshot::Sender<FlushSummary>),
    Stats(oneshot::Sender<BatchStats>),
    ResetStats(oneshot::Sender<()>),
}

/// 收集器句柄，可任意克隆并在多个生产者间共享
#[derive(Clone)]
pub struct BatchCollectorHandle {
    tx: mpsc::Sender<BatchCommand>,
}

impl BatchCollectorHandle {
    /// 投入一个事件；只等待命令队列的空位，从不等待冲刷，也不返回错误
    pub async fn add(&self, event: Event) {
        if let Err(mpsc::error::SendError(BatchCommand::Add(event))) =
            self.tx.send(BatchCommand::Add(event)).await
        {
            tracing::debug!(event_id = event.id(), "batch collector stopped, event discarded");
        }
    }

    /// 立即冲刷所有来源，完成后返回本次产生的批次数与事件数
    pub async fn flush_now(&self) -> DomainResult<FlushSummary> {
        self.request(BatchCommand::Flush).await
    }

    pub async fn get_stats(&self) -> DomainResult<BatchStats> {
        self.request(BatchCommand::Stats).await
    }

    /// 重置计数器，已缓冲但未冲刷的事件保留
    pub async fn reset_stats(&self) -> DomainResult<()> {
        self.request(BatchCommand::ResetStats).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> BatchCommand,
    ) -> DomainResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }
}

fn stopped() -> DomainError {
    DomainError::CoordinatorStopped {
        name: "batch_collector",
    }
}

pub struct BatchCollector {
    config: BatchConfig,
    bus: Arc<dyn EventBus>,
    buffers: BTreeMap<EventSource, VecDeque<Event>>,
    buffered: usize,
    saturated: bool,
    stats: BatchStats,
}

impl BatchCollector {
    pub fn new(config: BatchConfig, bus: Arc<dyn EventBus>) -> Self {
        Self {
            config,
            bus,
            buffers: BTreeMap::new(),
            buffered: 0,
            saturated: false,
            stats: BatchStats {
                since: Utc::now(),
                ..Default::default()
            },
        }
    }

    /// 启动协调任务，`token` 取消后执行关闭策略并退出
    pub fn spawn(self, token: CancellationToken) -> (BatchCollectorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.mailbox_capacity.max(1));
        let task = tokio::spawn(self.run(rx, token));
        (BatchCollectorHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<BatchCommand>, token: CancellationToken) {
        let window = self.config.batch_window().max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + window, window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            batch_window_ms = self.config.batch_window_ms,
            max_batch_size = self.config.max_batch_size,
            max_buffer_events = self.config.max_buffer_events,
            "batch collector started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush_all(FlushTrigger::Timer).await;
                }
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
            }
        }

        self.shutdown(rx).await;
    }

    async fn handle(&mut self, cmd: BatchCommand) {
        match cmd {
            BatchCommand::Add(event) => self.add(event).await,
            BatchCommand::Flush(reply) => {
                let summary = self.flush_now().await;
                let _ = reply.send(summary);
            }
            BatchCommand::Stats(reply) => {
                let _ = reply.send(self.snapshot());
            }
            BatchCommand::ResetStats(reply) => {
                self.reset_stats();
                let _ = reply.send(());
            }
        }
    }

    async fn add(&mut self, event: Event) {
        let source = event.source().clone();
        if self.accept(event) {
            let len = self.buffers.get(&source).map_or(0, VecDeque::len);
            if len >= self.config.max_batch_size {
                self.flush_source(&source, FlushTrigger::Threshold).await;
            }
        }
    }

    /// 记录并缓冲事件；缓冲已满时拒收并返回 false
    fn accept(&mut self, event: Event) -> bool {
        let source = event.source().clone();
        self.stats.events_added += 1;
        let counters = self.stats.by_source.entry(source.to_string()).or_default();
        counters.added += 1;

        if self.buffered >= self.config.max_buffer_events {
            counters.dropped += 1;
            self.stats.events_dropped += 1;
            if !self.saturated {
                self.saturated = true;
                tracing::warn!(
                    buffered = self.buffered,
                    max_buffer_events = self.config.max_buffer_events,
                    "batch buffer full, rejecting incoming events"
                );
            }
            tracing::debug!(event_id = event.id(), source = %source, "event dropped");
            return false;
        }

        self.buffers.entry(source).or_default().push_back(event);
        self.buffered += 1;
        true
    }

    async fn flush_now(&mut self) -> FlushSummary {
        if self.buffered == 0 {
            self.stats.empty_flushes += 1;
            tracing::debug!("manual flush with empty buffers");
            return FlushSummary::default();
        }
        self.flush_all(FlushTrigger::Manual).await
    }

    async fn flush_all(&mut self, trigger: FlushTrigger) -> FlushSummary {
        let sources: Vec<EventSource> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(source, _)| source.clone())
            .collect();

        let mut summary = FlushSummary::default();
        for source in sources {
            let flushed = self.flush_source(&source, trigger).await;
            if flushed > 0 {
                summary.merge(FlushSummary {
                    batches: 1,
                    events: flushed,
                });
            }
        }
        summary
    }

    /// 取出某来源最早的至多 `max_batch_size` 个事件并发布为一个批次，余下的留待下个周期
    async fn flush_source(&mut self, source: &EventSource, trigger: FlushTrigger) -> usize {
        let Some(buffer) = self.buffers.get_mut(source) else {
            return 0;
        };
        let take = buffer.len().min(self.config.max_batch_size.max(1));
        if take == 0 {
            return 0;
        }
        let events: Vec<Event> = buffer.drain(..take).collect();
        if buffer.is_empty() {
            self.buffers.remove(source);
        }
        self.buffered -= take;
        if self.buffered < self.config.max_buffer_events {
            self.saturated = false;
        }

        self.stats
            .by_source
            .entry(source.to_string())
            .or_default()
            .batched += take as u64;
        self.stats.events_batched += take as u64;
        self.stats.batches_created += 1;

        let batch = BatchEvent::new(events, source.clone());
        tracing::debug!(
            batch_id = batch.batch_id(),
            source = %source,
            count = take,
            trigger = trigger.as_str(),
            "batch flushed"
        );

        if let Err(err) = self.bus.publish(&Topic::batched(), batch.into()).await {
            self.stats.publish_failures += 1;
            tracing::warn!(source = %source, error = %err, "failed to publish batch");
        }
        take
    }

    fn snapshot(&self) -> BatchStats {
        let mut stats = self.stats.clone();
        stats.buffered = self.buffered as u64;
        for counters in stats.by_source.values_mut() {
            counters.buffered = 0;
        }
        for (source, buffer) in &self.buffers {
            stats.by_source.entry(source.to_string()).or_default().buffered = buffer.len() as u64;
        }
        stats
    }

    /// 以当前缓冲深度为新的 `added` 基线，保证重置后守恒关系仍成立
    fn reset_stats(&mut self) {
        let mut stats = BatchStats {
            events_added: self.buffered as u64,
            since: Utc::now(),
            ..Default::default()
        };
        for (source, buffer) in &self.buffers {
            stats.by_source.insert(
                source.to_string(),
                SourceCounters {
                    added: buffer.len() as u64,
                    ..Default::default()
                },
            );
        }
        self.stats = stats;
        tracing::debug!(buffered = self.buffered, "batch stats reset");
    }

    async fn shutdown(mut self, mut rx: mpsc::Receiver<BatchCommand>) {
        rx.close();
        // 已入队的事件仍然接收，请求类命令直接丢弃应答
        while let Ok(cmd) = rx.try_recv() {
            if let BatchCommand::Add(event) = cmd {
                self.accept(event);
            }
        }

        match self.config.shutdown_policy {
            ShutdownPolicy::Flush => {
                let mut total = FlushSummary::default();
                while self.buffered > 0 {
                    let summary = self.flush_all(FlushTrigger::Shutdown).await;
                    if summary.events == 0 {
                        break;
                    }
                    total.merge(summary);
                }
                tracing::info!(
                    batches = total.batches,
                    events = total.events,
                    "batch collector stopped after final flush"
                );
            }
            ShutdownPolicy::Discard => {
                let discarded = self.buffered;
                self.buffers.clear();
                self.buffered = 0;
                tracing::info!(discarded, "batch collector stopped, buffered events discarded");
            }
        }
    }
}
