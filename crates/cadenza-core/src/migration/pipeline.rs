use std::collections::HashSet;
use std::fmt;

use crate::migration::error::MigrationError;
use crate::migration::steps;
use crate::storage::tree::ConfigMap;

/// Facts about the running system that migration steps may consult.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    /// Domains of providers that ship with the system and are set up automatically
    pub builtin_domains: HashSet<String>,
}

impl MigrationContext {
    pub fn new<I, S>(builtin_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            builtin_domains: builtin_domains.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single structural upgrade of the raw settings tree.
pub trait Migration: Send + Sync {
    /// Short identifier used in logs and reports
    fn name(&self) -> &'static str;

    /// Apply the step in place. Returns whether anything changed.
    fn apply(&self, tree: &mut ConfigMap, ctx: &MigrationContext) -> Result<bool, MigrationError>;
}

/// Outcome of one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Steps that reported a change, in run order
    pub applied: Vec<&'static str>,
    /// Steps that failed, with the logged reason
    pub failed: Vec<(&'static str, String)>,
}

impl MigrationReport {
    /// Whether the tree must be persisted
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Ordered set of migration steps.
pub struct MigrationPipeline {
    steps: Vec<Box<dyn Migration>>,
    context: MigrationContext,
}

impl MigrationPipeline {
    /// An empty pipeline
    pub fn new(context: MigrationContext) -> Self {
        Self {
            steps: Vec::new(),
            context,
        }
    }

    /// A pipeline holding the built-in step catalog, in its canonical order.
    pub fn with_builtin_steps(context: MigrationContext) -> Self {
        let mut pipeline = Self::new(context);
        pipeline.register(Box::new(steps::DropCorruptProviders));
        pipeline.register(Box::new(steps::ManualIpsToList));
        pipeline.register(Box::new(steps::SampleRatesToStrings));
        pipeline.register(Box::new(steps::RelocateOutputLimiter));
        pipeline.register(Box::new(steps::BackfillOnboardDone));
        pipeline.register(Box::new(steps::RenameProviderDomain::new("slimproto", "squeezelite")));
        pipeline.register(Box::new(steps::HidePlayerToUiOption));
        pipeline
    }

    /// Append a step; steps run in registration order.
    pub fn register(&mut self, step: Box<dyn Migration>) {
        self.steps.push(step);
    }

    pub fn context(&self) -> &MigrationContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step once against `tree`.
    pub fn run(&self, tree: &mut ConfigMap) -> MigrationReport {
        let mut report = MigrationReport::default();
        for step in &self.steps {
            match step.apply(tree, &self.context) {
                Ok(true) => {
                    log::info!("Applied settings migration '{}'", step.name());
                    report.applied.push(step.name());
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!("Settings migration '{}' failed: {}", step.name(), e);
                    report.failed.push((step.name(), e.to_string()));
                }
            }
        }
        report
    }
}

impl Default for MigrationPipeline {
    fn default() -> Self {
        Self::with_builtin_steps(MigrationContext::default())
    }
}

impl fmt::Debug for MigrationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.steps.iter().map(|step| step.name()).collect();
        f.debug_struct("MigrationPipeline")
            .field("steps", &names)
            .field("context", &self.context)
            .finish()
    }
}
