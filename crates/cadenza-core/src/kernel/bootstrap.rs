use std::sync::Arc;

use crate::config::ConfigController;
use crate::crypto::SecretCipher;
use crate::event::{DefaultEventManager, EventManager, SystemEvent};
use crate::kernel::component::{ComponentRegistry, KernelComponent};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::migration::{MigrationContext, MigrationPipeline};
use crate::provider::{ConfigEntryResolver, ManifestRegistry, RuntimeHooks};
use crate::storage::{ConfigStore, StoreSettings};

/// The assembled config core: store, cipher, controller and event manager.
///
/// Construction loads and migrates the settings tree and derives the secret
/// key. [`Application::start`] brings the components up and creates the
/// configs of builtin providers; [`Application::shutdown`] stops them in
/// reverse order, which flushes pending settings to disk.
pub struct Application {
    store: ConfigStore,
    events: Arc<DefaultEventManager>,
    controller: Arc<ConfigController>,
    components: ComponentRegistry,
    running: bool,
}

impl Application {
    /// Open the settings file described by `settings` and wire up the core.
    pub async fn bootstrap(
        settings: &StoreSettings,
        manifests: ManifestRegistry,
        resolver: Arc<dyn ConfigEntryResolver>,
        hooks: RuntimeHooks,
    ) -> Result<Self> {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        let pipeline = MigrationPipeline::with_builtin_steps(MigrationContext::new(manifests.builtin_domains()));
        let store = ConfigStore::open(settings, &pipeline).await?;
        log::info!("Using settings file: {}", settings.settings_path().display());
        Self::with_store(store, manifests, resolver, hooks)
    }

    /// Wire up the core around an already loaded store.
    pub fn with_store(
        store: ConfigStore,
        manifests: ManifestRegistry,
        resolver: Arc<dyn ConfigEntryResolver>,
        hooks: RuntimeHooks,
    ) -> Result<Self> {
        let cipher = SecretCipher::from_store(&store)?;
        let events = Arc::new(DefaultEventManager::new());
        let controller = Arc::new(ConfigController::new(
            store.clone(),
            Arc::new(cipher),
            Arc::new(manifests),
            resolver,
            hooks,
            events.clone(),
        ));

        // The store stops last so that it flushes whatever the others wrote
        let mut components = ComponentRegistry::new();
        components.register(Arc::new(store.clone()));
        components.register(events.clone());

        Ok(Self {
            store,
            events,
            controller,
            components,
            running: false,
        })
    }

    /// Initialize and start all components, then set up builtin providers.
    pub async fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Start,
                component_name: None,
                message: "Application already started".to_string(),
                source: None,
            });
        }
        for component in self.components.iter() {
            log::debug!("Initializing component: {}", component.name());
            component
                .initialize()
                .await
                .map_err(|e| lifecycle_error(KernelLifecyclePhase::Initialize, component.as_ref(), e))?;
        }
        for component in self.components.iter() {
            log::debug!("Starting component: {}", component.name());
            component
                .start()
                .await
                .map_err(|e| lifecycle_error(KernelLifecyclePhase::Start, component.as_ref(), e))?;
        }

        let mut builtin: Vec<String> = self.controller.manifests().builtin_domains().into_iter().collect();
        builtin.sort();
        for domain in builtin {
            self.controller.create_builtin_provider_config(&domain).await?;
        }

        self.running = true;
        self.events.dispatch(&SystemEvent::ApplicationStart).await;
        log::info!("{} started", constants::APP_NAME);
        Ok(())
    }

    /// Stop all components in reverse order. The first failure is returned
    /// after every component had its chance to stop.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.running {
            self.events.dispatch(&SystemEvent::ApplicationShutdown).await;
        }
        let mut first_error = None;
        for component in self.components.iter().rev() {
            log::debug!("Stopping component: {}", component.name());
            if let Err(e) = component.stop().await {
                log::error!("Error stopping component {}: {}", component.name(), e);
                first_error.get_or_insert(lifecycle_error(KernelLifecyclePhase::Shutdown, component.as_ref(), e));
            }
        }
        self.running = false;
        log::info!("{} stopped", constants::APP_NAME);
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn controller(&self) -> &Arc<ConfigController> {
        &self.controller
    }

    pub fn event_manager(&self) -> &Arc<DefaultEventManager> {
        &self.events
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("store", &self.store)
            .field("components", &self.components.len())
            .field("running", &self.running)
            .finish()
    }
}

fn lifecycle_error(phase: KernelLifecyclePhase, component: &dyn KernelComponent, source: Error) -> Error {
    Error::KernelLifecycleError {
        phase,
        component_name: Some(component.name().to_string()),
        message: format!("Component {} failed", component.name()),
        source: Some(Box::new(source)),
    }
}
