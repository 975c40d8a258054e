//! # Cadenza Core Migration Errors
//!
//! A failing step is reported with [`MigrationError`]; the pipeline logs it
//! and moves on to the next step.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// A settings path held a value of the wrong kind for the step to work on
    #[error("Migration step '{step}' found {found} at '{path}', expected {expected}")]
    UnexpectedShape {
        step: &'static str,
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Migration step '{step}' failed: {message}")]
    StepFailed { step: &'static str, message: String },
}
