//! 直播控制平台事件中枢的领域层（relay-domain）
//!
//! 负责把各类上游（聊天平台、直播软件、游戏遥测、音乐服务、系统内部）的原始事件
//! 归一化为统一的 `Event`，并按优先级与类型决定立即广播或进入时间窗口批处理：
//! - 事件模型（`event`）：`Event`、`BatchEvent`、投递单元 `Delivery` 以及传输/持久化视图；
//! - 归一化（`transform`）：按来源的纯函数转换，任何输入都不会失败；
//! - 事件系统（`eventing`）：广播总线、路由器、批处理收集器与编排它们的管线引擎。
//!
//! 典型用法：
//! 1. 生产端适配器拿到原始载荷，调用 `transform::from_twitch` 等函数得到 `Event`；
//! 2. 通过 `EventPipeline` 启动路由器与批处理收集器；
//! 3. 调用 `RouterHandle::route` 投递事件，下游订阅 `events:all` / `events:<source>` /
//!    `events:batched` 主题消费结果。
//!
pub mod error;
pub mod event;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod transform;
