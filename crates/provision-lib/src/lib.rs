//! Provisioning library for rented compute nodes
//!
//! This crate provides the core functionality for:
//! - Deployment config building, container naming and launch artifacts
//! - Branding injection and branded deployment scripts
//! - Heartbeat health, freshness, uptime and attention evaluation
//! - Collaborator traits and observability

pub mod branding;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod models;
pub mod observability;
pub mod policy;
pub mod script;
pub mod telemetry;

pub use error::{ProvisionError, Result};
pub use models::*;
pub use observability::{ProvisionMetrics, StructuredLogger};
