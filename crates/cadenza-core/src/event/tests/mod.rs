mod manager_tests;

use std::any::Any;

use crate::event::{Event, EventPriority};

#[derive(Debug, Clone)]
pub(super) struct TestEvent {
    pub name: &'static str,
    pub data: String,
    pub priority: EventPriority,
}

impl TestEvent {
    pub fn new(name: &'static str, data: &str) -> Self {
        Self {
            name,
            data: data.to_string(),
            priority: EventPriority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }
}

impl Event for TestEvent {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> EventPriority {
        self.priority
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
