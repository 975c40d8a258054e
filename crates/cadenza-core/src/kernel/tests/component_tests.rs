use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::kernel::component::{ComponentRegistry, KernelComponent};
use crate::kernel::error::Result;

#[derive(Debug)]
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl KernelComponent for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> Result<()> {
        self.log.lock().unwrap().push(format!("init {}", self.name));
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.log.lock().unwrap().push(format!("start {}", self.name));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.lock().unwrap().push(format!("stop {}", self.name));
        Ok(())
    }
}

#[tokio::test]
async fn test_registry_keeps_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ComponentRegistry::new();
    assert!(registry.is_empty());
    for name in ["store", "events"] {
        registry.register(Arc::new(Recorder {
            name,
            log: log.clone(),
        }));
    }
    assert_eq!(registry.len(), 2);

    for component in registry.iter() {
        component.start().await.unwrap();
    }
    for component in registry.iter().rev() {
        component.stop().await.unwrap();
    }

    assert_eq!(
        *log.lock().unwrap(),
        vec!["start store", "start events", "stop events", "stop store"]
    );
}
