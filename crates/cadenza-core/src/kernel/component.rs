use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::error::Result;

/// Core component lifecycle trait for all kernel components
#[async_trait]
pub trait KernelComponent: Send + Sync + Debug {
    fn name(&self) -> &'static str;
    async fn initialize(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

/// Ordered set of components started front to back and stopped back to front.
#[derive(Default, Debug)]
pub struct ComponentRegistry {
    components: Vec<Arc<dyn KernelComponent>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self { components: Vec::new() }
    }

    /// Register a component; registration order is initialization order.
    pub fn register(&mut self, component: Arc<dyn KernelComponent>) {
        self.components.push(component);
    }

    /// Components in initialization order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn KernelComponent>> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
