//! Deployment artifact generation
//!
//! This module provides:
//! - Deployment config building with category port defaults
//! - Deterministic container naming
//! - Imperative (`docker run`) and declarative (compose) launch artifacts
//! - The template catalog interface

mod catalog;
mod command;
mod config;
mod manifest;
mod naming;

pub use catalog::{StaticCatalog, TemplateCatalog};
pub use command::{gpu_request, LaunchCommand, RUNTIME_BINARY};
pub use config::{DeploymentConfig, DeploymentConfigBuilder, DeploymentRequest, EnvVars};
pub use manifest::{
    ComposeManifest, ComposeService, DeploySection, DeviceReservation, Reservations, Resources,
    GPU_DRIVER, RESTART_POLICY,
};
pub use naming::{generate_container_name, is_valid_container_name, ContainerName};

use serde::Serialize;

use crate::error::Result;

/// Both launch artifacts for one deployment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentArtifacts {
    pub container_name: ContainerName,
    pub command: String,
    pub manifest: String,
}

/// Render the imperative and declarative forms of a deployment
pub fn render_artifacts(
    config: &DeploymentConfig,
    name: &ContainerName,
) -> Result<DeploymentArtifacts> {
    let command = LaunchCommand::new(config, name);
    let manifest = ComposeManifest::new(config, name);

    Ok(DeploymentArtifacts {
        container_name: name.clone(),
        command: command.to_shell(),
        manifest: manifest.to_yaml()?,
    })
}
