use anyhow::Result as AnyResult;
use relay_domain::error::{DomainError, DomainResult};
use relay_domain::event::{Delivery, Event, EventSource, Priority};
use relay_domain::eventing::{
    BatchConfig, EventBus, EventHandler, EventPipeline, HandledEventType, InMemoryEventBus,
    PipelineConfig, RouteAck, RouterConfig, Topic,
};
use relay_domain::transform::{self, TransformOptions};
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn batching_config(window_ms: u64, max_batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        router: RouterConfig {
            batchable_types: ["channel.chat.message".to_string()].into_iter().collect(),
            ..Default::default()
        },
        batch: BatchConfig {
            batch_window_ms: window_ms,
            max_batch_size,
            ..Default::default()
        },
    }
}

fn chat(message_id: &str, text: &str) -> Event {
    transform::from_twitch(
        "channel.chat.message",
        &json!({
            "message_id": message_id,
            "chatter_user_id": "42",
            "chatter_user_name": "viewer",
            "message": {"text": text, "fragments": [{"type": "text", "text": text}]},
        }),
        &TransformOptions::default(),
    )
}

/// 收集某个主题在给定时间内收到的全部投递
async fn drain(stream: &mut BoxStream<'static, DomainResult<Delivery>>, wait: Duration) -> Vec<Delivery> {
    let mut out = Vec::new();
    while let Ok(Some(item)) = tokio::time::timeout(wait, stream.next()).await {
        if let Ok(delivery) = item {
            out.push(delivery);
        }
    }
    out
}

#[derive(Default)]
struct Audit {
    seen: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl EventHandler for Audit {
    fn handler_name(&self) -> &str {
        "audit"
    }
    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::Many(vec!["channel.subscribe".into(), "ironmon.checkpoint".into()])
    }
    async fn handle(&self, event: &Event) -> AnyResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().unwrap().push(event.id().to_string());
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn mixed_traffic_is_split_between_immediate_and_batched_topics() {
    let bus = Arc::new(InMemoryEventBus::new(256));
    let mut all = bus.subscribe(&Topic::all()).await;
    let mut ironmon = bus.subscribe(&Topic::source(&EventSource::Ironmon)).await;
    let mut batched = bus.subscribe(&Topic::batched()).await;
    let audit = Arc::new(Audit::default());

    let handle = EventPipeline::builder()
        .event_bus(bus.clone())
        .event_handlers(vec![audit.clone()])
        .config(batching_config(50, 3))
        .build()
        .start()
        .unwrap();
    let router = handle.router().clone();

    for i in 0..5 {
        let ack = router.route(chat(&format!("m{i}"), &format!("hello {i}"))).await;
        assert!(ack.is_accepted());
    }
    let subscribe = transform::from_twitch(
        "channel.subscribe",
        &json!({"user_id": "7", "user_name": "sub", "tier": "1000", "is_gift": false}),
        &TransformOptions::default(),
    );
    let checkpoint = transform::from_ironmon(
        "checkpoint",
        &json!({"id": "cp-1", "metadata": {"checkpoint": "BROCK", "seed": 12}}),
        &TransformOptions::default(),
    );
    let urgent = transform::from_twitch(
        "channel.chat.message",
        &json!({"message_id": "urgent", "message": {"text": "!alert"}}),
        &TransformOptions::builder().priority(Priority::Critical).build(),
    );
    let subscribe_id = subscribe.id().to_string();
    router.route(subscribe).await;
    router.route(checkpoint).await;
    router.route(urgent).await;

    let immediate: Vec<String> = drain(&mut all, Duration::from_millis(300))
        .await
        .iter()
        .map(|d| d.id().to_string())
        .collect();
    assert_eq!(immediate, vec![subscribe_id.clone(), "cp-1".to_string(), "urgent".to_string()]);

    let on_ironmon = drain(&mut ironmon, Duration::from_millis(100)).await;
    assert_eq!(on_ironmon.len(), 1);
    assert_eq!(on_ironmon[0].event_type(), "ironmon.checkpoint");

    let batches = drain(&mut batched, Duration::from_millis(300)).await;
    let batched_ids: Vec<String> = batches
        .iter()
        .filter_map(Delivery::as_batch)
        .inspect(|b| assert!(b.count() <= 3))
        .flat_map(|b| b.events().iter().map(|e| e.id().to_string()))
        .collect();
    assert_eq!(batched_ids, vec!["m0", "m1", "m2", "m3", "m4"]);

    let stats = router.get_stats().await.unwrap();
    assert_eq!(stats.events_routed, 8);
    assert_eq!(stats.critical_events, 1);
    assert_eq!(stats.events_batched, 5);
    assert_eq!(stats.events_immediate, 3);
    assert_eq!(stats.by_type["channel.chat.message"], 6);

    let batch_stats = handle.collector().get_stats().await.unwrap();
    assert_eq!(batch_stats.events_added, 5);
    assert_eq!(batch_stats.events_batched, 5);
    assert!(batch_stats.is_conserved());

    let _ = tokio::time::timeout(Duration::from_secs(1), async {
        while audit.calls.load(Ordering::Relaxed) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    let mut seen = audit.seen.lock().unwrap().clone();
    seen.sort();
    let mut expected = vec![subscribe_id, "cp-1".to_string()];
    expected.sort();
    assert_eq!(seen, expected);

    handle.shutdown_gracefully().await;
}

/// 对指定主题发布总是失败的总线
struct FlakyBus {
    inner: InMemoryEventBus,
    broken: Topic,
    attempts: AtomicUsize,
}

#[async_trait::async_trait]
impl EventBus for FlakyBus {
    async fn publish(&self, topic: &Topic, delivery: Delivery) -> DomainResult<usize> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if *topic == self.broken {
            return Err(DomainError::event_bus("topic unavailable"));
        }
        self.inner.publish(topic, delivery).await
    }
    async fn subscribe(&self, topic: &Topic) -> BoxStream<'static, DomainResult<Delivery>> {
        self.inner.subscribe(topic).await
    }
}

#[tokio::test]
async fn publish_failures_are_counted_and_never_stop_the_pipeline() {
    let bus = Arc::new(FlakyBus {
        inner: InMemoryEventBus::new(64),
        broken: Topic::batched(),
        attempts: AtomicUsize::new(0),
    });
    let mut all = bus.subscribe(&Topic::all()).await;

    let handle = EventPipeline::builder()
        .event_bus(bus.clone())
        .event_handlers(vec![])
        .config(batching_config(60_000, 10))
        .build()
        .start()
        .unwrap();

    handle.router().route(chat("lost", "into the void")).await;
    // 路由器处理完上一条后才会回复统计，保证事件已交给收集器
    handle.router().get_stats().await.unwrap();
    let summary = handle.collector().flush_now().await.unwrap();
    assert_eq!(summary.batches, 1);

    let stats = handle.collector().get_stats().await.unwrap();
    assert_eq!(stats.publish_failures, 1);
    assert_eq!(stats.events_batched, 1);
    assert!(stats.is_conserved());

    let follow = transform::from_twitch(
        "channel.follow",
        &json!({"user_id": "9", "user_name": "fan", "followed_at": "2024-05-01T12:00:00Z"}),
        &TransformOptions::default(),
    );
    assert_eq!(handle.router().route(follow).await, RouteAck::Accepted);
    let delivered = drain(&mut all, Duration::from_millis(200)).await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].event_type(), "channel.follow");

    assert!(bus.attempts.load(Ordering::Relaxed) >= 3);
    handle.shutdown_gracefully().await;
}

#[tokio::test]
async fn full_buffer_drops_newest_events_across_sources() {
    let bus = Arc::new(InMemoryEventBus::new(64));
    let mut batched = bus.subscribe(&Topic::batched()).await;
    let mut config = batching_config(60_000, 100);
    config.router.batchable_types.insert("obs.InputVolumeChanged".to_string());
    config.batch.max_buffer_events = 4;

    let handle = EventPipeline::builder()
        .event_bus(bus.clone())
        .event_handlers(vec![])
        .config(config)
        .build()
        .start()
        .unwrap();

    for i in 0..3 {
        handle.router().route(chat(&format!("c{i}"), "spam")).await;
        let volume = transform::from_obs(
            "InputVolumeChanged",
            &json!({"inputName": "Mic", "inputVolumeDb": -i}),
            &TransformOptions::builder().id(format!("v{i}")).build(),
        );
        handle.router().route(volume).await;
    }
    handle.router().get_stats().await.unwrap();

    let stats = handle.collector().get_stats().await.unwrap();
    assert_eq!(stats.events_added, 6);
    assert_eq!(stats.buffered, 4);
    assert_eq!(stats.events_dropped, 2);
    assert!(stats.is_conserved());

    handle.collector().flush_now().await.unwrap();
    let mut kept: Vec<String> = drain(&mut batched, Duration::from_millis(200))
        .await
        .iter()
        .filter_map(Delivery::as_batch)
        .flat_map(|b| b.events().iter().map(|e| e.id().to_string()))
        .collect();
    kept.sort();
    assert_eq!(kept, vec!["c0", "c1", "v0", "v1"]);

    handle.shutdown_gracefully().await;
}
