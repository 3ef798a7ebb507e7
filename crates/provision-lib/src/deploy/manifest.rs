//! Declarative compose manifest
//!
//! The manifest carries the same ports, environment, volumes, GPU
//! reservation and command override as [`super::LaunchCommand`], in the
//! same order. Compose interpolates `$` in these fields, so values are
//! escaped to reach the container literally.

use std::collections::BTreeMap;

use serde::Serialize;

use super::config::{DeploymentConfig, EnvVars};
use super::naming::ContainerName;
use crate::error::Result;

/// Restart policy: always restart unless manually stopped
pub const RESTART_POLICY: &str = "unless-stopped";

/// Device driver requested for GPU reservations
pub const GPU_DRIVER: &str = "nvidia";

/// Multi-service manifest with a single service keyed by the container name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeManifest {
    services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeService {
    pub image: String,
    pub container_name: String,
    pub restart: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "EnvVars::is_empty")]
    pub environment: EnvVars,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeploySection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploySection {
    pub resources: Resources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resources {
    pub reservations: Reservations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservations {
    pub devices: Vec<DeviceReservation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReservation {
    pub driver: String,
    pub count: u32,
    pub capabilities: Vec<String>,
}

impl DeploySection {
    fn gpus(count: u32) -> Self {
        Self {
            resources: Resources {
                reservations: Reservations {
                    devices: vec![DeviceReservation {
                        driver: GPU_DRIVER.to_string(),
                        count,
                        capabilities: vec!["gpu".to_string()],
                    }],
                },
            },
        }
    }
}

impl ComposeManifest {
    pub fn new(config: &DeploymentConfig, name: &ContainerName) -> Self {
        let service = ComposeService {
            image: config.image().to_string(),
            container_name: name.to_string(),
            restart: RESTART_POLICY.to_string(),
            ports: config
                .ports()
                .iter()
                .map(|p| format!("{}:{}", p, p))
                .collect(),
            environment: config
                .environment()
                .iter()
                .map(|(k, v)| (k, escape_interpolation(v)))
                .collect(),
            volumes: config.volumes().iter().map(|v| escape_interpolation(v)).collect(),
            deploy: config.requires_gpu().then(|| DeploySection::gpus(config.gpu_count())),
            command: config
                .command_args()
                .iter()
                .map(|w| escape_interpolation(w))
                .collect(),
        };

        let mut services = BTreeMap::new();
        services.insert(name.to_string(), service);
        Self { services }
    }

    /// The single service in this manifest
    pub fn service(&self) -> Option<&ComposeService> {
        self.services.values().next()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Escape `$` so compose passes the value through unexpanded
pub fn escape_interpolation(value: &str) -> String {
    value.replace('$', "$$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn name(n: &str) -> ContainerName {
        ContainerName::parse(n).unwrap()
    }

    fn parse(manifest: &ComposeManifest) -> Value {
        serde_yaml::from_str(&manifest.to_yaml().unwrap()).unwrap()
    }

    #[test]
    fn test_service_keyed_by_container_name() {
        let config = DeploymentConfig::builder("redis:7")
            .with_port(6379)
            .build()
            .unwrap();
        let doc = parse(&ComposeManifest::new(&config, &name("cache-u1")));

        let service = &doc["services"]["cache-u1"];
        assert_eq!(service["image"].as_str(), Some("redis:7"));
        assert_eq!(service["restart"].as_str(), Some("unless-stopped"));
        assert_eq!(service["ports"][0].as_str(), Some("6379:6379"));
    }

    #[test]
    fn test_empty_blocks_omitted() {
        let config = DeploymentConfig::builder("busybox")
            .with_port(22)
            .build()
            .unwrap();
        let yaml = ComposeManifest::new(&config, &name("bb-1")).to_yaml().unwrap();

        assert!(!yaml.contains("environment"));
        assert!(!yaml.contains("volumes"));
        assert!(!yaml.contains("deploy"));
        assert!(!yaml.contains("command"));
    }

    #[test]
    fn test_gpu_reservation_block() {
        let config = DeploymentConfig::builder("cuda")
            .with_port(22)
            .with_gpu_count(3)
            .build()
            .unwrap();
        let doc = parse(&ComposeManifest::new(&config, &name("gpu-1")));

        let device = &doc["services"]["gpu-1"]["deploy"]["resources"]["reservations"]["devices"][0];
        assert_eq!(device["driver"].as_str(), Some("nvidia"));
        assert_eq!(device["count"].as_u64(), Some(3));
        assert_eq!(device["capabilities"][0].as_str(), Some("gpu"));
    }

    #[test]
    fn test_order_preserved() {
        let config = DeploymentConfig::builder("app")
            .with_ports([9000, 80, 22])
            .with_env("ZED", "1")
            .with_env("ALPHA", "2")
            .with_volume("/b:/b")
            .with_volume("/a:/a")
            .with_command("serve --port 9000")
            .build()
            .unwrap();
        let manifest = ComposeManifest::new(&config, &name("app-1"));
        let doc = parse(&manifest);
        let service = &doc["services"]["app-1"];

        let ports: Vec<_> = service["ports"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap().to_string())
            .collect();
        assert_eq!(ports, vec!["9000:9000", "80:80", "22:22"]);

        let env_keys: Vec<_> = service["environment"]
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap().to_string())
            .collect();
        assert_eq!(env_keys, vec!["ZED", "ALPHA"]);

        assert_eq!(service["volumes"][0].as_str(), Some("/b:/b"));
        assert_eq!(service["volumes"][1].as_str(), Some("/a:/a"));
        let command: Vec<_> = service["command"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|w| w.as_str().unwrap().to_string())
            .collect();
        assert_eq!(command, vec!["serve", "--port", "9000"]);
    }

    #[test]
    fn test_dollar_signs_reach_container_literally() {
        let config = DeploymentConfig::builder("app")
            .with_port(22)
            .with_env("PASSWORD", "pa$$w0rd$HOME")
            .with_volume("/srv/$USER:/data")
            .with_command("run --token $TOKEN")
            .build()
            .unwrap();
        let doc = parse(&ComposeManifest::new(&config, &name("app-1")));
        let service = &doc["services"]["app-1"];

        assert_eq!(service["environment"]["PASSWORD"].as_str(), Some("pa$$$$w0rd$$HOME"));
        assert_eq!(service["volumes"][0].as_str(), Some("/srv/$$USER:/data"));
        assert_eq!(service["command"][2].as_str(), Some("$$TOKEN"));

        // Undoing compose's `$$` escape yields the value the launch command quotes
        let shell = crate::deploy::LaunchCommand::new(&config, &name("app-1")).to_shell();
        let delivered = service["environment"]["PASSWORD"].as_str().unwrap().replace("$$", "$");
        assert!(shell.contains(&format!("'PASSWORD={}'", delivered)));
    }
}
