//! Deployment config building
//!
//! Turns a raw deployment request into a validated, immutable
//! [`DeploymentConfig`]. Missing ports are filled from the category table.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::models::Template;
use crate::policy::default_ports_for_category;

/// Environment variables in insertion order with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars(Vec<(String, String)>);

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable; an existing key keeps its position and takes the new value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = EnvVars::new();
        for (k, v) in iter {
            env.insert(k, v);
        }
        env
    }
}

impl Serialize for EnvVars {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnvVars {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EnvVisitor;

        impl<'de> Visitor<'de> for EnvVisitor {
            type Value = EnvVars;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of environment variables")
            }

            // Entries arrive in document order
            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<EnvVars, A::Error> {
                let mut env = EnvVars::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    env.insert(k, v);
                }
                Ok(env)
            }
        }

        deserializer.deserialize_map(EnvVisitor)
    }
}

fn default_category() -> String {
    "custom".to_string()
}

/// Raw deployment request as received from callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub image: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<u16>>,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub environment: EnvVars,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl DeploymentRequest {
    pub fn new(image: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            category: category.into(),
            ports: None,
            gpu_count: 0,
            environment: EnvVars::new(),
            volumes: Vec::new(),
            command: None,
        }
    }

    /// Seed a request from a catalog template
    ///
    /// GPU templates reserve a single device unless the caller raises it.
    pub fn from_template(template: &Template) -> Self {
        Self {
            ports: template.default_ports.clone(),
            gpu_count: u32::from(template.gpu_required),
            ..Self::new(template.image.clone(), template.category.clone())
        }
    }

    /// Validate and normalize into a [`DeploymentConfig`]
    pub fn build(self) -> Result<DeploymentConfig> {
        let mut builder = DeploymentConfig::builder(self.image)
            .with_category(self.category)
            .with_gpu_count(self.gpu_count)
            .with_volumes(self.volumes);
        if let Some(ports) = self.ports {
            builder = builder.with_ports(ports);
        }
        for (k, v) in self.environment.iter() {
            builder = builder.with_env(k, v);
        }
        if let Some(command) = self.command {
            builder = builder.with_command(command);
        }
        builder.build()
    }
}

/// Canonical, validated description of a single container launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    image: String,
    ports: Vec<u16>,
    gpu_count: u32,
    environment: EnvVars,
    volumes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    /// The override split into shell words, quoting removed
    #[serde(skip)]
    command_args: Vec<String>,
}

impl DeploymentConfig {
    pub fn builder(image: impl Into<String>) -> DeploymentConfigBuilder {
        DeploymentConfigBuilder::new(image)
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn gpu_count(&self) -> u32 {
        self.gpu_count
    }

    pub fn environment(&self) -> &EnvVars {
        &self.environment
    }

    pub fn volumes(&self) -> &[String] {
        &self.volumes
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Words of the command override; empty without one
    pub fn command_args(&self) -> &[String] {
        &self.command_args
    }

    pub fn requires_gpu(&self) -> bool {
        self.gpu_count > 0
    }
}

/// Builder for [`DeploymentConfig`]
#[derive(Debug, Clone)]
pub struct DeploymentConfigBuilder {
    image: String,
    category: String,
    ports: Vec<u16>,
    gpu_count: u32,
    environment: EnvVars,
    volumes: Vec<String>,
    command: Option<String>,
}

impl DeploymentConfigBuilder {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            category: default_category(),
            ports: Vec::new(),
            gpu_count: 0,
            environment: EnvVars::new(),
            volumes: Vec::new(),
            command: None,
        }
    }

    /// Set the template category used for the default port fallback
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_gpu_count(mut self, count: u32) -> Self {
        self.gpu_count = count;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key, value);
        self
    }

    pub fn with_volume(mut self, mount: impl Into<String>) -> Self {
        self.volumes.push(mount.into());
        self
    }

    pub fn with_volumes(mut self, mounts: impl IntoIterator<Item = String>) -> Self {
        self.volumes.extend(mounts);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn build(self) -> Result<DeploymentConfig> {
        let image = self.image.trim().to_string();
        if image.is_empty() {
            return Err(ProvisionError::EmptyImage);
        }

        if let Some(port) = self.ports.iter().find(|p| **p == 0) {
            return Err(ProvisionError::InvalidPort(*port));
        }

        if let Some(key) = self.environment.keys().find(|k| !is_valid_env_key(k)) {
            return Err(ProvisionError::InvalidEnvKey(key.to_string()));
        }

        if let Some(mount) = self.volumes.iter().find(|v| !is_valid_volume(v)) {
            return Err(ProvisionError::InvalidVolume(mount.clone()));
        }

        let ports = if self.ports.is_empty() {
            let defaults = default_ports_for_category(&self.category);
            debug!(category = %self.category, ports = ?defaults, "Using category default ports");
            defaults.to_vec()
        } else {
            self.ports
        };

        let command = self
            .command
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let command_args = match &command {
            Some(c) => shlex::split(c).ok_or_else(|| ProvisionError::InvalidCommand(c.clone()))?,
            None => Vec::new(),
        };

        Ok(DeploymentConfig {
            image,
            ports,
            gpu_count: self.gpu_count,
            environment: self.environment,
            volumes: self.volumes,
            command,
            command_args,
        })
    }
}

fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty()
        && !key.contains('=')
        && !key.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn is_valid_volume(mount: &str) -> bool {
    match mount.split_once(':') {
        Some((host, container)) => !host.trim().is_empty() && !container.trim().is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports_from_category() {
        let config = DeploymentRequest::new("pytorch/pytorch:latest", "machine-learning")
            .build()
            .unwrap();
        assert_eq!(config.ports(), &[8888, 6006, 22]);
    }

    #[test]
    fn test_empty_ports_use_category_defaults() {
        let mut request = DeploymentRequest::new("postgres:16", "database");
        request.ports = Some(vec![]);
        let config = request.build().unwrap();
        assert_eq!(config.ports(), &[5432, 3306, 27017, 22]);
    }

    #[test]
    fn test_unknown_category_falls_back_to_ssh() {
        let config = DeploymentRequest::new("ubuntu:22.04", "holography")
            .build()
            .unwrap();
        assert_eq!(config.ports(), &[22]);
    }

    #[test]
    fn test_explicit_ports_pass_through() {
        let mut request = DeploymentRequest::new("nginx", "web-server");
        request.ports = Some(vec![8080, 22]);
        request.gpu_count = 2;
        request.command = Some("nginx -g 'daemon off;'".to_string());
        let config = request.build().unwrap();

        assert_eq!(config.ports(), &[8080, 22]);
        assert_eq!(config.gpu_count(), 2);
        assert_eq!(config.command(), Some("nginx -g 'daemon off;'"));
        assert_eq!(config.command_args(), &["nginx", "-g", "daemon off;"]);
    }

    #[test]
    fn test_unbalanced_command_rejected() {
        let err = DeploymentConfig::builder("nginx")
            .with_command("nginx -g 'daemon off;")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidCommand(_)));
        assert!(err.is_validation());
    }

    #[test]
    fn test_empty_image_rejected() {
        let err = DeploymentRequest::new("   ", "custom").build().unwrap_err();
        assert!(matches!(err, ProvisionError::EmptyImage));
        assert!(err.is_validation());
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = DeploymentConfig::builder("redis")
            .with_ports([6379, 0])
            .build()
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidPort(0)));
    }

    #[test]
    fn test_bad_env_key_rejected() {
        let err = DeploymentConfig::builder("redis")
            .with_env("BAD KEY", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidEnvKey(k) if k == "BAD KEY"));
    }

    #[test]
    fn test_bad_volume_rejected() {
        let err = DeploymentConfig::builder("redis")
            .with_volume("/data")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidVolume(_)));

        assert!(DeploymentConfig::builder("redis")
            .with_volume("/srv/data:/data:ro")
            .build()
            .is_ok());
    }

    #[test]
    fn test_env_preserves_insertion_order() {
        let config = DeploymentConfig::builder("app")
            .with_env("ZETA", "1")
            .with_env("ALPHA", "2")
            .with_env("MID", "3")
            .with_env("ZETA", "4")
            .build()
            .unwrap();

        let keys: Vec<_> = config.environment().keys().collect();
        assert_eq!(keys, vec!["ZETA", "ALPHA", "MID"]);
        assert_eq!(config.environment().get("ZETA"), Some("4"));
    }

    #[test]
    fn test_blank_command_dropped() {
        let config = DeploymentConfig::builder("app")
            .with_command("   ")
            .build()
            .unwrap();
        assert_eq!(config.command(), None);
        assert!(config.command_args().is_empty());
    }

    #[test]
    fn test_request_json_keeps_env_order() {
        let json = r#"{
            "image": "jupyter/base-notebook",
            "category": "data-science",
            "gpuCount": 1,
            "environment": {"TOKEN": "abc", "A_FIRST": "1", "MODE": "lab"}
        }"#;
        let request: DeploymentRequest = serde_json::from_str(json).unwrap();
        let keys: Vec<_> = request.environment.keys().collect();
        assert_eq!(keys, vec!["TOKEN", "A_FIRST", "MODE"]);

        let config = request.build().unwrap();
        assert_eq!(config.ports(), &[8888, 22]);
        assert!(config.requires_gpu());
    }

    #[test]
    fn test_from_template() {
        let template = Template {
            id: "sd".to_string(),
            name: "Stable Diffusion".to_string(),
            category: "rendering".to_string(),
            image: "sd/webui:latest".to_string(),
            default_ports: Some(vec![7860, 22]),
            gpu_required: true,
            min_gpu_memory_gb: Some(12),
        };
        let config = DeploymentRequest::from_template(&template).build().unwrap();
        assert_eq!(config.ports(), &[7860, 22]);
        assert_eq!(config.gpu_count(), 1);
    }
}
