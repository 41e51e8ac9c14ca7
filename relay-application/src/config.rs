//! 应用配置
//!
//! 加载顺序：默认值 → JSON 配置文件（可选）→ `.env` 与 `RELAY_*` 环境变量 → 校验。
//!
//! 配置源由 more-config 合并，键以 `:` 分层；环境变量用 `__` 分层，例如
//! `RELAY_BATCH__MAX_BATCH_SIZE=25`、`RELAY_ROUTER__BATCHABLE_TYPES__0=channel.chat.message`。
//!
use crate::error::{AppError, AppResult};
use config::{ext::*, *};
use relay_domain::eventing::{BatchConfig, PipelineConfig, RouterConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const ENV_PREFIX: &str = "RELAY_";

/// 广播总线配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// 每个主题的广播缓冲区容量，慢订阅者超过后会丢失最早的投递
    pub topic_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            topic_capacity: 1024,
        }
    }
}

/// 日志配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `RUST_LOG` 未设置时使用的过滤指令
    pub level: String,
    /// 输出 JSON 结构化日志
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub router: RouterConfig,
    pub batch: BatchConfig,
    pub bus: BusConfig,
    pub log: LogConfig,
}

impl RelayConfig {
    /// 按完整顺序加载并校验配置
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        // .env 缺失不是错误；必须先于环境变量源读取
        dotenvy::dotenv().ok();

        let config = Self::from_sources(path, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    /// 合并 JSON 文件与带前缀的环境变量，绑定为配置，不做校验
    pub fn from_sources(path: Option<&Path>, env_prefix: &str) -> AppResult<Self> {
        let mut builder = DefaultConfigurationBuilder::new();
        if let Some(path) = path {
            let file = path.to_string_lossy().to_string();
            builder.add_json_file(&file.is().optional());
        }
        builder.add_env_vars_with_prefix(env_prefix);

        let root: Box<dyn ConfigurationRoot> = builder
            .build()
            .map_err(|e| AppError::Config(format!("{e:?}")))?;

        Self::bind(root.iter(None).map(|(key, value)| (key.to_string(), value.to_string())))
    }

    /// 把扁平的 `a:b:0` 键值对还原为 JSON 树后反序列化
    pub fn bind<I>(entries: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = Value::Object(Map::new());
        for (key, value) in entries {
            let path: Vec<String> = key
                .split(':')
                .filter(|segment| !segment.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
            if !path.is_empty() {
                insert(&mut tree, &path, &value);
            }
        }
        serde_json::from_value(into_arrays(tree)).map_err(AppError::ConfigBind)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.pipeline().validate()?;
        if self.bus.topic_capacity == 0 {
            return Err(relay_domain::error::DomainError::invalid_config(
                "bus.topic_capacity must be > 0",
            )
            .into());
        }
        Ok(())
    }

    /// 事件管线所需的部分
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            router: self.router.clone(),
            batch: self.batch.clone(),
        }
    }
}

fn insert(node: &mut Value, path: &[String], raw: &str) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        // 分节本身也会以空值出现，不能覆盖已有子键
        let has_children = map.get(head).is_some_and(Value::is_object);
        if !(has_children && raw.is_empty()) {
            map.insert(head.clone(), scalar(raw));
        }
        return;
    }
    let child = map.entry(head.clone()).or_insert(Value::Null);
    insert(child, rest, raw);
}

// 所有配置源都以字符串保存标量
fn scalar(raw: &str) -> Value {
    match raw {
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Value::from(n);
    }
    Value::String(raw.to_string())
}

/// 键全为数字下标的对象还原为数组
fn into_arrays(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let indexed: Option<Vec<(usize, Value)>> = map
        .iter()
        .map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v.clone())))
        .collect();
    match indexed {
        Some(mut items) if !items.is_empty() => {
            items.sort_by_key(|(i, _)| *i);
            Value::Array(items.into_iter().map(|(_, v)| into_arrays(v)).collect())
        }
        _ => Value::Object(map.into_iter().map(|(k, v)| (k, into_arrays(v))).collect()),
    }
}
