//! Configuration management for the CLI

use anyhow::{Context, Result};
use provision_lib::BrandingProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default output format when `--format` is not given
    pub default_format: Option<OutputFormat>,
    /// Operator branding written into generated scripts
    pub branding: Option<BrandingProfile>,
    /// JSON template catalog used instead of the built-in one
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `~/.config/nrctl/config.json`, if present
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Branding profile, falling back to the built-in operator
    pub fn branding_profile(&self) -> BrandingProfile {
        self.branding.clone().unwrap_or_default()
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("nrctl").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.default_format.is_none());
        assert_eq!(config.branding_profile(), BrandingProfile::default());
    }

    #[test]
    fn test_branding_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "default_format": "json",
                "branding": {
                    "provider": "Acme",
                    "slug": "acme",
                    "support": "ops@acme.test",
                    "docs": "https://acme.test",
                    "banner": "Acme Compute"
                }
            }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_format, Some(OutputFormat::Json));
        assert_eq!(config.branding_profile().slug, "acme");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
