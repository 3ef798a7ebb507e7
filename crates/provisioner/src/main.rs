//! Provisioner - deployment and branding artifact service
//!
//! Renders launch commands, compose manifests and branded deployment
//! scripts for rented nodes, and evaluates node heartbeats.

use anyhow::{Context, Result};
use provision_lib::{
    branding::BrandingInjector,
    deploy::{StaticCatalog, TemplateCatalog},
    StructuredLogger,
};
use provisioner::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting provisioner");

    let config = ServiceConfig::load()?;
    info!(node_name = %config.node_name, provider = %config.provider, "Provisioner configured");

    let catalog: Arc<dyn TemplateCatalog> = match &config.catalog_path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read template catalog {}", path))?;
            Arc::new(StaticCatalog::from_json(&json)?)
        }
        None => Arc::new(StaticCatalog::builtin()),
    };
    info!(templates = catalog.list().len(), "Template catalog loaded");

    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(SERVICE_VERSION, config.api_port);

    let app_state = Arc::new(api::AppState::new(
        BrandingInjector::new(config.branding_profile()),
        catalog,
        config.poll_policy(),
        logger.clone(),
    ));
    app_state.set_ready(true);

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }
    info!("Shutting down");

    Ok(())
}
