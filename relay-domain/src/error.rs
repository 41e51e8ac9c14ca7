//! 领域层统一错误定义
//!
//! 归一化路径本身不产生错误（畸形输入一律降级处理），这里只覆盖序列化、
//! 事件总线与协调者（coordinator）生命周期等最小必要集合。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    // --- 事件系统 ---
    #[error("event bus error: {reason}")]
    EventBus { reason: String },
    #[error("subscriber lagged behind, {skipped} deliveries skipped")]
    Lagged { skipped: u64 },
    #[error("coordinator stopped: {name}")]
    CoordinatorStopped { name: &'static str },

    // --- 配置 ---
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}

impl DomainError {
    pub fn event_bus(reason: impl Into<String>) -> Self {
        DomainError::EventBus {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        DomainError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
