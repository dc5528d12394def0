//! Shared types for the calculator orchestrator and worker: the data model,
//! the error taxonomy, environment configuration, ID generation, logging
//! setup, and generated gRPC types.

pub mod config;
pub mod domain;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod proto;
