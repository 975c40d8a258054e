//! # Cadenza Core Event System Errors
//!
//! [`EventSystemError`] covers handler registration. Dispatch
//! itself never fails: notifications are fire-and-forget.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventSystemError {
    #[error("Failed to register event handler for '{event_name}': {reason}")]
    HandlerRegistrationFailed { event_name: String, reason: String },
}
