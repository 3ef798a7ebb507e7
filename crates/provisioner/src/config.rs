//! Service configuration

use anyhow::Result;
use provision_lib::{branding::PollPolicy, BrandingProfile};
use serde::Deserialize;
use tracing::warn;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name reported in structured logs
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Operator display name written into branded nodes
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_slug")]
    pub slug: String,

    #[serde(default = "default_support")]
    pub support: String,

    #[serde(default = "default_docs")]
    pub docs: String,

    /// First line of the login banner; derived from the provider when unset
    #[serde(default)]
    pub banner: Option<String>,

    /// JSON template catalog; the built-in catalog is used when unset
    #[serde(default)]
    pub catalog_path: Option<String>,

    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u32,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_provider() -> String {
    BrandingProfile::default().provider
}

fn default_slug() -> String {
    BrandingProfile::default().slug
}

fn default_support() -> String {
    BrandingProfile::default().support
}

fn default_docs() -> String {
    BrandingProfile::default().docs
}

fn default_poll_max_attempts() -> u32 {
    PollPolicy::default().max_attempts
}

fn default_poll_interval() -> u32 {
    PollPolicy::default().interval_secs
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            provider: default_provider(),
            slug: default_slug(),
            support: default_support(),
            docs: default_docs(),
            banner: None,
            catalog_path: None,
            poll_max_attempts: default_poll_max_attempts(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional `provisioner` config file and
    /// `PROVISIONER_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("provisioner").required(false))
            .add_source(config::Environment::with_prefix("PROVISIONER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            ServiceConfig::default()
        }))
    }

    /// Branding profile assembled from the configured provider fields
    pub fn branding_profile(&self) -> BrandingProfile {
        BrandingProfile {
            provider: self.provider.clone(),
            slug: self.slug.clone(),
            support: self.support.clone(),
            docs: self.docs.clone(),
            banner: self
                .banner
                .clone()
                .unwrap_or_else(|| format!("Welcome to {} GPU Cloud", self.provider)),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.poll_max_attempts, self.poll_interval_secs)
    }
}
