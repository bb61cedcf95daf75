//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles database operations for a specific domain entity.
//! The assignment tables sit behind the [`AssignmentStore`] trait so the
//! dispatch core can run against Postgres or an in-memory store.

pub mod assignment;
pub mod client;
pub mod memory;
pub mod postgres;

// Re-export for convenience
pub use assignment::{AssignmentStore, Candidate, NewResultStub, StoreError};
pub use client as client_repository;
pub use memory::MemoryAssignmentStore;
pub use postgres::PgAssignmentStore;
