//! Swarm Orchestrator
//!
//! Dispatches pending test runs to polling worker clients, one platform at a
//! time, under a priority override and least-recently-served fairness.

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
