//! # Cadenza Core Events
//!
//! Fire-and-forget notifications about configuration changes.
//!
//! Handlers are registered either by event name or by concrete event type on
//! an [`EventManager`]. The config controller dispatches a [`ConfigEvent`]
//! after each stored change and never inspects the outcome.
pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod types;

use std::any::Any;
use std::fmt;

use async_trait::async_trait;

/// Identifier of a registered handler
pub type EventId = u64;

/// Event priority level; queued events are processed highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum EventPriority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Result of event processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Keep passing the event to the remaining handlers
    Continue,
    Stop,
}

pub trait Event: Any + fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> EventPriority {
        EventPriority::Normal
    }

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
pub trait AsyncEventHandler: Send + Sync {
    async fn handle(&self, event: &dyn Event) -> EventResult;
}

pub use dispatcher::{EventDispatcher, SharedEventDispatcher};
pub use error::EventSystemError;
pub use manager::{BoxedEvent, DefaultEventManager, EventManager};
pub use types::{ConfigEvent, SystemEvent};

#[cfg(test)]
mod tests;
