//! 事件处理器（EventHandler）
//!
//! 路由器在立即路径上，对少数关注的事件类型（聊天消息、订阅、频道更新、
//! 游戏检查点）调用专属处理器。处理器在独立任务中执行，失败只计数，不影响路由。
//!
use crate::event::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum HandledEventType {
    One(String),
    Many(Vec<String>),
    All,
}

/// 事件处理器：处理某一类型的事件
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// 处理器名称（用于失败计数与日志）
    fn handler_name(&self) -> &str;
    /// 返回该处理器支持的事件类型
    fn handled_event_type(&self) -> HandledEventType;
    /// 处理事件
    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub(crate) struct HandlerRegistry {
    by_type: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    all: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub(crate) fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        let mut by_type: HashMap<String, Vec<Arc<dyn EventHandler>>> = HashMap::new();
        let mut all: Vec<Arc<dyn EventHandler>> = Vec::new();

        for h in handlers {
            match h.handled_event_type() {
                HandledEventType::All => all.push(h),
                HandledEventType::One(t) => {
                    by_type.entry(t).or_default().push(h);
                }
                HandledEventType::Many(ts) => {
                    for t in ts {
                        by_type.entry(t).or_default().push(h.clone());
                    }
                }
            }
        }

        Self { by_type, all }
    }

    pub(crate) fn matching(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        let mut merged: Vec<Arc<dyn EventHandler>> = Vec::new();
        if let Some(list) = self.by_type.get(event_type) {
            merged.extend(list.iter().cloned());
        }
        merged.extend(self.all.iter().cloned());
        merged
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, HandledEventType);

    #[async_trait]
    impl EventHandler for Named {
        fn handler_name(&self) -> &str {
            self.0
        }
        fn handled_event_type(&self) -> HandledEventType {
            self.1.clone()
        }
        async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn matching_merges_typed_and_catch_all_handlers() {
        let registry = HandlerRegistry::new(vec![
            Arc::new(Named("chat", HandledEventType::One("channel.chat.message".into()))),
            Arc::new(Named(
                "subs",
                HandledEventType::Many(vec!["channel.subscribe".into(), "channel.update".into()]),
            )),
            Arc::new(Named("audit", HandledEventType::All)),
        ]);

        let names = |t: &str| -> Vec<String> {
            registry
                .matching(t)
                .iter()
                .map(|h| h.handler_name().to_string())
                .collect()
        };

        assert_eq!(names("channel.chat.message"), vec!["chat", "audit"]);
        assert_eq!(names("channel.update"), vec!["subs", "audit"]);
        assert_eq!(names("channel.follow"), vec!["audit"]);
        assert!(!registry.is_empty());
        assert!(HandlerRegistry::default().is_empty());
    }
}
