//! Swarm Core
//!
//! Core types and abstractions for the test swarm dispatcher.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, Run, Assignment, Client, etc.)
//! - DTOs: Data transfer objects exchanged between the orchestrator and polling clients

pub mod domain;
pub mod dto;
