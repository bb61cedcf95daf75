//! Data Transfer Objects for client/orchestrator communication
//!
//! This module contains DTOs exchanged between the orchestrator and polling
//! worker clients. DTOs are lightweight representations of domain entities
//! optimized for network transfer.

pub mod client;
pub mod run;
