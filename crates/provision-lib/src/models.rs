//! Core data models shared by the deployment and telemetry sides

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters for identity injection into a rented node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingContext {
    pub instance_id: String,
    pub region: String,
    pub plan: String,
    pub expires_at: String,
    pub username: String,
}

/// Operator identity written into every branded node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingProfile {
    /// Display name of the provider
    pub provider: String,
    /// Short token used for the metadata directory and the profile marker
    pub slug: String,
    /// Support contact
    pub support: String,
    /// Documentation reference
    pub docs: String,
    /// Static first line of the login banner
    pub banner: String,
}

impl Default for BrandingProfile {
    fn default() -> Self {
        Self {
            provider: "NodeRent".to_string(),
            slug: "noderent".to_string(),
            support: "support@noderent.dev".to_string(),
            docs: "https://docs.noderent.dev".to_string(),
            banner: "Welcome to NodeRent GPU Cloud".to_string(),
        }
    }
}

/// Template entry supplied by the template catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ports: Option<Vec<u16>>,
    #[serde(default)]
    pub gpu_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_gpu_memory_gb: Option<u32>,
}

/// Coarse health classification of one heartbeat sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthVerdict {
    Healthy,
    Warning,
    Critical,
}

impl HealthVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthVerdict::Healthy => "healthy",
            HealthVerdict::Warning => "warning",
            HealthVerdict::Critical => "critical",
        }
    }
}

impl std::fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry observation reported by a rented node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatSample {
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_temp_celsius: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Health as previously recorded alongside the sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthVerdict>,
}

impl HeartbeatSample {
    /// Online sample with no metrics reported, stamped at `at`
    pub fn online(at: DateTime<Utc>) -> Self {
        Self {
            is_online: true,
            cpu_usage_percent: None,
            memory_usage_percent: None,
            gpu_temp_celsius: None,
            created_at: at,
            last_updated_at: Some(at),
            health: None,
        }
    }

    /// Offline sample stamped at `at`
    pub fn offline(at: DateTime<Utc>) -> Self {
        Self {
            is_online: false,
            ..Self::online(at)
        }
    }

    pub fn with_cpu(mut self, percent: f64) -> Self {
        self.cpu_usage_percent = Some(percent);
        self
    }

    pub fn with_memory(mut self, percent: f64) -> Self {
        self.memory_usage_percent = Some(percent);
        self
    }

    pub fn with_gpu_temp(mut self, celsius: f64) -> Self {
        self.gpu_temp_celsius = Some(celsius);
        self
    }

    pub fn with_health(mut self, health: HealthVerdict) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_last_updated(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_updated_at = at;
        self
    }
}

/// Operator attention verdict with ordered reasons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionReport {
    pub needs_attention: bool,
    pub reasons: Vec<String>,
}

impl AttentionReport {
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            needs_attention: !reasons.is_empty(),
            reasons,
        }
    }
}
