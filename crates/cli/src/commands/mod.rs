//! Subcommand implementations

pub mod branding;
pub mod catalog;
pub mod health;
pub mod render;

use anyhow::{Context as _, Result};
use provision_lib::{branding::BrandingInjector, deploy::StaticCatalog};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;
use crate::output::OutputFormat;

/// Settings resolved from flags and the config file
pub struct Context {
    pub format: OutputFormat,
    pub injector: BrandingInjector,
    pub catalog: StaticCatalog,
}

impl Context {
    /// Flags win over the config file; the config file wins over defaults
    pub fn load(catalog: Option<PathBuf>, format: Option<OutputFormat>) -> Result<Self> {
        let config = Config::load()?;

        let catalog = match catalog.or_else(|| config.catalog_path.clone()) {
            Some(path) => {
                debug!(path = %path.display(), "Loading template catalog");
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read catalog {}", path.display()))?;
                StaticCatalog::from_json(&json)?
            }
            None => StaticCatalog::builtin(),
        };

        Ok(Self {
            format: format.or(config.default_format).unwrap_or_default(),
            injector: BrandingInjector::new(config.branding_profile()),
            catalog,
        })
    }
}
