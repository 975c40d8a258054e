use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::TestEvent;
use crate::event::manager::{DefaultEventManager, EventManager};
use crate::event::{ConfigEvent, EventResult, SystemEvent};
use crate::kernel::component::KernelComponent;

#[tokio::test]
async fn test_sync_handlers_receive_dispatched_events() {
    let manager = DefaultEventManager::new();
    let by_name = Arc::new(AtomicU32::new(0));
    let by_type = Arc::new(AtomicU32::new(0));

    let by_name_clone = Arc::clone(&by_name);
    manager
        .register_sync_handler(ConfigEvent::PROVIDER_SAVED, move |_| {
            by_name_clone.fetch_add(1, Ordering::SeqCst);
            EventResult::Continue
        })
        .await
        .unwrap();
    let by_type_clone = Arc::clone(&by_type);
    manager
        .register_sync_type_handler::<SystemEvent, _>(move |_| {
            by_type_clone.fetch_add(1, Ordering::SeqCst);
            EventResult::Continue
        })
        .await;

    manager
        .dispatch(&ConfigEvent::ProviderConfigSaved {
            instance_id: "demo".to_string(),
            config: serde_json::json!({}),
        })
        .await;
    manager.dispatch(&SystemEvent::ApplicationStart).await;

    assert_eq!(by_name.load(Ordering::SeqCst), 1);
    assert_eq!(by_type.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_flushes_the_queue() {
    let manager = DefaultEventManager::new();
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = Arc::clone(&counter);
    manager
        .register_sync_handler("queued.event", move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            EventResult::Continue
        })
        .await
        .unwrap();

    manager.queue_event(Box::new(TestEvent::new("queued.event", "1"))).await;
    manager.queue_event(Box::new(TestEvent::new("queued.event", "2"))).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    manager.stop().await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(manager.process_queue().await, 0);
}
