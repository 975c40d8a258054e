use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::event::error::EventSystemError;
use crate::event::{AsyncEventHandler, Event, EventId, EventResult};

/// Owned future returned by handler closures
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = EventResult> + Send + 'a>>;

/// Handler closure registered by event name
pub type NameHandlerFn = Box<dyn for<'a> Fn(&'a dyn Event) -> BoxFuture<'a> + Send + Sync>;

/// Handler closure registered by event type
pub type TypedHandlerFn<E> = Box<dyn for<'a> Fn(&'a E) -> BoxFuture<'a> + Send + Sync>;

type HandlerList = Vec<(EventId, Arc<dyn AsyncEventHandler>)>;

struct NamedHandler {
    handler: NameHandlerFn,
}

#[async_trait]
impl AsyncEventHandler for NamedHandler {
    async fn handle(&self, event: &dyn Event) -> EventResult {
        (self.handler)(event).await
    }
}

/// Calls its handler only for events of type `E`
struct TypedHandler<E: Event> {
    handler: TypedHandlerFn<E>,
}

#[async_trait]
impl<E: Event> AsyncEventHandler for TypedHandler<E> {
    async fn handle(&self, event: &dyn Event) -> EventResult {
        match event.as_any().downcast_ref::<E>() {
            Some(event) => (self.handler)(event).await,
            None => EventResult::Continue,
        }
    }
}

/// Handler tables and the pending event queue.
///
/// Name handlers run before type handlers, each in registration order, until
/// one returns [`EventResult::Stop`].
#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<&'static str, HandlerList>,
    type_handlers: HashMap<TypeId, HandlerList>,
    next_handler_id: EventId,
    queue: VecDeque<Box<dyn Event>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("name_handlers", &self.handlers.values().map(Vec::len).sum::<usize>())
            .field("type_handlers", &self.type_handlers.values().map(Vec::len).sum::<usize>())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl EventDispatcher {
    fn next_id(&mut self) -> EventId {
        self.next_handler_id += 1;
        self.next_handler_id
    }

    pub fn register_handler(&mut self, event_name: &'static str, handler: NameHandlerFn) -> Result<EventId, EventSystemError> {
        if event_name.trim().is_empty() {
            return Err(EventSystemError::HandlerRegistrationFailed {
                event_name: event_name.to_string(),
                reason: "event name must not be empty".to_string(),
            });
        }
        let id = self.next_id();
        self.handlers
            .entry(event_name)
            .or_default()
            .push((id, Arc::new(NamedHandler { handler })));
        Ok(id)
    }

    pub fn register_type_handler<E: Event>(&mut self, handler: TypedHandlerFn<E>) -> EventId {
        let id = self.next_id();
        self.type_handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, Arc::new(TypedHandler { handler })));
        id
    }

    /// Handlers interested in `event`, in the order they run
    fn handlers_for(&self, event: &dyn Event) -> Vec<Arc<dyn AsyncEventHandler>> {
        let by_name = self.handlers.get(event.name()).into_iter().flatten();
        let by_type = self.type_handlers.get(&event.as_any().type_id()).into_iter().flatten();
        by_name.chain(by_type).map(|(_, handler)| Arc::clone(handler)).collect()
    }

    pub fn queue_event(&mut self, event: Box<dyn Event>) {
        self.queue.push_back(event);
    }

    /// Remove all queued events, highest priority first.
    pub fn drain_queue(&mut self) -> Vec<Box<dyn Event>> {
        let mut events: Vec<_> = self.queue.drain(..).collect();
        events.sort_by_key(|event| std::cmp::Reverse(event.priority()));
        events
    }
}

/// Thread-safe handle to an [`EventDispatcher`].
#[derive(Clone, Default)]
pub struct SharedEventDispatcher {
    dispatcher: Arc<Mutex<EventDispatcher>>,
}

impl fmt::Debug for SharedEventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEventDispatcher").finish_non_exhaustive()
    }
}

impl SharedEventDispatcher {
    /// Run the handlers of `event`. The dispatcher is not locked while they
    /// run, so handlers may register handlers or queue events themselves.
    pub async fn dispatch(&self, event: &dyn Event) -> EventResult {
        let handlers = self.dispatcher.lock().await.handlers_for(event);
        run_handlers(handlers, event).await
    }

    pub async fn queue_event(&self, event: Box<dyn Event>) {
        self.dispatcher.lock().await.queue_event(event);
    }

    /// Dispatch every queued event. Returns how many were processed.
    pub async fn process_queue(&self) -> usize {
        let events = self.dispatcher.lock().await.drain_queue();
        for event in &events {
            self.dispatch(event.as_ref()).await;
        }
        events.len()
    }

    pub async fn register_handler(&self, event_name: &'static str, handler: NameHandlerFn) -> Result<EventId, EventSystemError> {
        self.dispatcher.lock().await.register_handler(event_name, handler)
    }

    pub async fn register_type_handler<E: Event>(&self, handler: TypedHandlerFn<E>) -> EventId {
        self.dispatcher.lock().await.register_type_handler(handler)
    }
}

async fn run_handlers(handlers: Vec<Arc<dyn AsyncEventHandler>>, event: &dyn Event) -> EventResult {
    for handler in handlers {
        if handler.handle(event).await == EventResult::Stop {
            return EventResult::Stop;
        }
    }
    EventResult::Continue
}

/// Wrap a synchronous closure as a name handler.
pub fn sync_event_handler<F>(f: F) -> NameHandlerFn
where
    F: Fn(&dyn Event) -> EventResult + Send + Sync + 'static,
{
    Box::new(move |event| {
        let result = f(event);
        Box::pin(async move { result })
    })
}

/// Wrap a synchronous closure as a type handler.
pub fn sync_typed_handler<E, F>(f: F) -> TypedHandlerFn<E>
where
    E: Event,
    F: Fn(&E) -> EventResult + Send + Sync + 'static,
{
    Box::new(move |event| {
        let result = f(event);
        Box::pin(async move { result })
    })
}
