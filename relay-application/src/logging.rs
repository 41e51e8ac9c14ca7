//! 日志初始化
//!
//! `RUST_LOG` 优先，否则使用配置中的级别；输出为人类可读格式或 JSON。
//!
use crate::config::LogConfig;
use crate::error::{AppError, AppResult};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init(config: &LogConfig) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::Logging(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| AppError::Logging(e.to_string()))?;

    tracing::debug!(level = %config.level, json = config.json, "logging initialized");
    Ok(())
}
