//! `relay`：从标准输入读取 NDJSON 原始事件，经归一化与路由后，把立即事件与批次
//! 事件以 NDJSON 写到标准输出。日志写到标准错误。
//!
use anyhow::Context;
use clap::Parser;
use futures_util::{StreamExt, stream};
use relay_application::{Relay, RelayConfig, logging};
use relay_domain::error::{DomainError, DomainResult};
use relay_domain::event::Delivery;
use relay_domain::eventing::Topic;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "relay", version, about = "Normalize, route and batch stream events")]
struct Cli {
    /// JSON 配置文件
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
    /// 输出 JSON 结构化日志
    #[arg(long)]
    json_logs: bool,
    /// 日志级别（`RUST_LOG` 未设置时生效）
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RelayConfig::load(cli.config.as_deref()).context("loading config")?;
    if cli.json_logs {
        config.log.json = true;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    logging::init(&config.log)?;

    let relay = Relay::start(&config)?;
    let deliveries = stream::select(
        relay.subscribe(&Topic::all()).await,
        relay.subscribe(&Topic::batched()).await,
    );
    let writer = tokio::spawn(write_deliveries(deliveries));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match relay.ingest().ingest_line(&line).await {
                    Ok(ack) if !ack.is_accepted() => break,
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "skipping malformed input line"),
                }
            }
        }
    }

    // 关闭前的统计快照；关闭时的最后冲刷不计入
    let report = relay.health().await?;
    relay.shutdown().await;
    tracing::info!(
        status = ?report.status,
        stats = %serde_json::to_string(&report)?,
        "relay stopped"
    );

    // 总线随 relay 释放后订阅流结束
    if tokio::time::timeout(Duration::from_secs(1), writer).await.is_err() {
        tracing::warn!("output writer did not finish in time");
    }
    Ok(())
}

async fn write_deliveries<S>(mut deliveries: S)
where
    S: stream::Stream<Item = DomainResult<Delivery>> + Unpin,
{
    let mut stdout = tokio::io::stdout();
    while let Some(item) = deliveries.next().await {
        let delivery = match item {
            Ok(delivery) => delivery,
            Err(DomainError::Lagged { skipped }) => {
                tracing::warn!(skipped, "output fell behind, deliveries skipped");
                continue;
            }
            Err(err) => {
                tracing::warn!(error = %err, "subscription error");
                continue;
            }
        };
        let mut line = match serde_json::to_vec(&delivery) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(id = delivery.id(), error = %err, "failed to encode delivery");
                continue;
            }
        };
        line.push(b'\n');
        if stdout.write_all(&line).await.is_err() {
            break;
        }
    }
    let _ = stdout.flush().await;
}
