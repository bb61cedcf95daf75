//! Core domain types
//!
//! This module contains the core domain structures used across swarm services.
//! These types represent the fundamental business entities and are shared between
//! the orchestrator (for persistence and dispatch) and worker clients.

pub mod assignment;
pub mod client;
pub mod job;
pub mod result_stub;
