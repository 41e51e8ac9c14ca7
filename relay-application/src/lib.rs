//! 事件中枢的应用层（relay-application）
//!
//! 在领域层之上提供：配置加载（`config`）、日志初始化（`logging`）、
//! 生产端接入门面（`ingest`）、健康快照（`health`）与运行时装配（`relay`）。
//!
pub mod config;
pub mod error;
pub mod health;
pub mod ingest;
pub mod logging;
pub mod relay;

pub use self::config::RelayConfig;
pub use error::{AppError, AppResult};
pub use health::{HealthReport, HealthStatus};
pub use ingest::{IngestRecord, IngestService};
pub use relay::Relay;
