//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod claim;
pub mod client;
pub mod credential;
pub mod dispatch;
pub mod issuer;
pub mod priority;
pub mod selector;

// Re-export for convenience
pub use client as client_service;
pub use dispatch::{DispatchError, DispatchSettings, Dispatcher};
pub use priority::{PriorityPolicy, PriorityTier};
