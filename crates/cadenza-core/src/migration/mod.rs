//! # Cadenza Core Migration
//!
//! Load-time upgrades of older persisted layouts.
//!
//! A [`MigrationPipeline`] runs an ordered list of [`Migration`] steps once,
//! directly after the settings tree was parsed. Steps are independent and
//! idempotent: each skips anything it does not recognise and reports whether
//! it changed the tree. A failing step is logged and never stops later steps.
//! The store persists the tree immediately when any step reported a change.
pub mod error;
pub mod pipeline;
pub mod steps;

pub use error::MigrationError;
pub use pipeline::{Migration, MigrationContext, MigrationPipeline, MigrationReport};
