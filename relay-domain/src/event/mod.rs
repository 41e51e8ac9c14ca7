//! 统一事件模型（Event Model）
//!
//! 定义所有上游事件归一化后的规范形态 `Event`、由批处理派生的 `BatchEvent`，
//! 以及总线上的投递单元 `Delivery` 与供下游使用的传输/持久化视图。

mod batch_event;
mod delivery;
mod event_meta;
mod event_source;
mod formats;
mod model;

pub use batch_event::{BATCH_EVENT_TYPE, BatchData, BatchEvent};
pub use delivery::Delivery;
pub use event_meta::{EventMeta, Priority};
pub use event_source::EventSource;
pub use formats::{StoredEvent, TransportEvent};
pub use model::Event;
