use std::fmt::Debug;

use async_trait::async_trait;

use crate::event::dispatcher::{self, NameHandlerFn, SharedEventDispatcher};
use crate::event::error::EventSystemError;
use crate::event::{Event, EventId, EventResult};
use crate::kernel::component::KernelComponent;
use crate::kernel::error::Result as KernelResult;

pub type BoxedEvent = Box<dyn Event>;

/// Event emitter shared by the kernel components.
#[async_trait]
pub trait EventManager: KernelComponent + Send + Sync {
    async fn register_handler(&self, event_name: &'static str, handler: NameHandlerFn) -> Result<EventId, EventSystemError>;

    async fn dispatch(&self, event: &dyn Event) -> EventResult;

    /// Queue an event for the next [`EventManager::process_queue`]
    async fn queue_event(&self, event: BoxedEvent);

    async fn process_queue(&self) -> usize;
}

/// [`EventManager`] over a [`SharedEventDispatcher`]. Queued events are
/// flushed when the component stops.
#[derive(Clone, Debug, Default)]
pub struct DefaultEventManager {
    dispatcher: SharedEventDispatcher,
}

impl DefaultEventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatcher(&self) -> &SharedEventDispatcher {
        &self.dispatcher
    }

    pub async fn register_sync_handler<F>(&self, event_name: &'static str, handler: F) -> Result<EventId, EventSystemError>
    where
        F: Fn(&dyn Event) -> EventResult + Send + Sync + 'static,
    {
        self.register_handler(event_name, dispatcher::sync_event_handler(handler))
            .await
    }

    pub async fn register_sync_type_handler<E, F>(&self, handler: F) -> EventId
    where
        E: Event,
        F: Fn(&E) -> EventResult + Send + Sync + 'static,
    {
        self.dispatcher
            .register_type_handler::<E>(dispatcher::sync_typed_handler(handler))
            .await
    }
}

#[async_trait]
impl KernelComponent for DefaultEventManager {
    fn name(&self) -> &'static str {
        "DefaultEventManager"
    }

    async fn initialize(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        let processed = self.process_queue().await;
        if processed > 0 {
            log::debug!("Flushed {} queued events", processed);
        }
        Ok(())
    }
}

#[async_trait]
impl EventManager for DefaultEventManager {
    async fn register_handler(&self, event_name: &'static str, handler: NameHandlerFn) -> Result<EventId, EventSystemError> {
        self.dispatcher.register_handler(event_name, handler).await
    }

    async fn dispatch(&self, event: &dyn Event) -> EventResult {
        log::debug!("Dispatching event '{}'", event.name());
        self.dispatcher.dispatch(event).await
    }

    async fn queue_event(&self, event: BoxedEvent) {
        self.dispatcher.queue_event(event).await
    }

    async fn process_queue(&self) -> usize {
        self.dispatcher.process_queue().await
    }
}
