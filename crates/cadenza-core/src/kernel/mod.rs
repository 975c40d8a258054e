//! # Cadenza Core Kernel
//!
//! Assembly and lifecycle of the config core.
//!
//! - **Bootstrap**: [`Application`](bootstrap::Application) loads the settings
//!   tree, runs the migrations, derives the secret key and builds the
//!   [`ConfigController`](crate::config::ConfigController).
//! - **Component lifecycle**: the [`KernelComponent`](component::KernelComponent)
//!   trait and the ordered [`ComponentRegistry`](component::ComponentRegistry).
//! - **Constants**: tree layout, well-known keys and defaults in `constants`.
//! - **Errors**: the aggregated [`Error`](error::Error) and `Result` alias.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;

pub use bootstrap::Application;
pub use component::{ComponentRegistry, KernelComponent};
pub use error::{BoxError, Error, Result};

#[cfg(test)]
mod tests;
