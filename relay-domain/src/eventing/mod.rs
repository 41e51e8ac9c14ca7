//! 事件系统（eventing）
//!
//! - `bus` / `bus_inmemory`：按主题发布订阅的广播总线；
//! - `router`：立即或批处理的路由判定与扇出；
//! - `batch`：按来源缓冲、定时冲刷的批处理收集器；
//! - `engine`：装配并监管上述协调任务的事件管线。
//!
pub mod batch;
pub mod bus;
pub mod bus_inmemory;
pub mod config;
pub mod engine;
pub mod handler;
pub mod router;
pub mod stats;

pub use batch::{BatchCollector, BatchCollectorHandle, FlushSummary};
pub use bus::{EventBus, Topic};
pub use bus_inmemory::InMemoryEventBus;
pub use config::{BatchConfig, PipelineConfig, RouterConfig, ShutdownPolicy};
pub use engine::{EventPipeline, PipelineHandle};
pub use handler::{EventHandler, HandledEventType};
pub use router::{RouteAck, Router, RouterHandle};
pub use stats::{BatchStats, RouterStats, SourceCounters};
