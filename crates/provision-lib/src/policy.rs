//! Static policy tables
//!
//! Read-only lookup data shared by the deployment and telemetry sides:
//! GPU hardware specs, default ports per template category, status display
//! metadata, the region catalog, container lifecycle states and the
//! heartbeat freshness window.

use serde::Serialize;
use std::time::Duration;

/// Heartbeats older than this are considered stale (5 minutes)
pub const HEARTBEAT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Administrative access port, always reachable on a rented node
pub const SSH_PORT: u16 = 22;

/// Known GPU hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GpuSpec {
    pub model: &'static str,
    pub vendor: &'static str,
    pub architecture: &'static str,
    pub memory_gb: u32,
    pub cuda_cores: u32,
    pub tdp_watts: u32,
}

pub static GPU_SPECS: &[GpuSpec] = &[
    GpuSpec {
        model: "H100 SXM",
        vendor: "NVIDIA",
        architecture: "Hopper",
        memory_gb: 80,
        cuda_cores: 16896,
        tdp_watts: 700,
    },
    GpuSpec {
        model: "A100 80GB",
        vendor: "NVIDIA",
        architecture: "Ampere",
        memory_gb: 80,
        cuda_cores: 6912,
        tdp_watts: 400,
    },
    GpuSpec {
        model: "A100 40GB",
        vendor: "NVIDIA",
        architecture: "Ampere",
        memory_gb: 40,
        cuda_cores: 6912,
        tdp_watts: 400,
    },
    GpuSpec {
        model: "L40S",
        vendor: "NVIDIA",
        architecture: "Ada Lovelace",
        memory_gb: 48,
        cuda_cores: 18176,
        tdp_watts: 350,
    },
    GpuSpec {
        model: "RTX A6000",
        vendor: "NVIDIA",
        architecture: "Ampere",
        memory_gb: 48,
        cuda_cores: 10752,
        tdp_watts: 300,
    },
    GpuSpec {
        model: "RTX 4090",
        vendor: "NVIDIA",
        architecture: "Ada Lovelace",
        memory_gb: 24,
        cuda_cores: 16384,
        tdp_watts: 450,
    },
    GpuSpec {
        model: "RTX 3090",
        vendor: "NVIDIA",
        architecture: "Ampere",
        memory_gb: 24,
        cuda_cores: 10496,
        tdp_watts: 350,
    },
    GpuSpec {
        model: "V100",
        vendor: "NVIDIA",
        architecture: "Volta",
        memory_gb: 32,
        cuda_cores: 5120,
        tdp_watts: 300,
    },
    GpuSpec {
        model: "T4",
        vendor: "NVIDIA",
        architecture: "Turing",
        memory_gb: 16,
        cuda_cores: 2560,
        tdp_watts: 70,
    },
];

/// Look up a GPU by model name (case-insensitive)
pub fn gpu_spec(model: &str) -> Option<&'static GpuSpec> {
    GPU_SPECS
        .iter()
        .find(|spec| spec.model.eq_ignore_ascii_case(model.trim()))
}

/// GPUs with at least `min_memory_gb` of device memory
pub fn gpus_with_memory(min_memory_gb: u32) -> impl Iterator<Item = &'static GpuSpec> {
    GPU_SPECS
        .iter()
        .filter(move |spec| spec.memory_gb >= min_memory_gb)
}

/// Default port sets per template category
pub static CATEGORY_PORTS: &[(&str, &[u16])] = &[
    ("machine-learning", &[8888, 6006, 22]),
    ("deep-learning", &[8888, 6006, 22]),
    ("data-science", &[8888, 22]),
    ("web-server", &[80, 443, 22]),
    ("database", &[5432, 3306, 27017, 22]),
    ("development", &[3000, 8080, 22]),
    ("rendering", &[8080, 22]),
    ("crypto", &[30303, 8545, 22]),
    ("custom", &[22]),
];

static SSH_ONLY: &[u16] = &[SSH_PORT];

/// Default ports for a category; unknown categories get SSH only
pub fn default_ports_for_category(category: &str) -> &'static [u16] {
    let category = category.trim();
    CATEGORY_PORTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, ports)| *ports)
        .unwrap_or(SSH_ONLY)
}

/// Display color tokens used by frontends and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Blue,
    Yellow,
    Red,
    Gray,
}

/// Label and color for a status value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub color: StatusColor,
}

/// Marketplace status of a rented resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Available,
    Rented,
    Maintenance,
    Offline,
}

impl ResourceStatus {
    pub const ALL: [ResourceStatus; 4] = [
        ResourceStatus::Available,
        ResourceStatus::Rented,
        ResourceStatus::Maintenance,
        ResourceStatus::Offline,
    ];

    pub fn display(&self) -> StatusDisplay {
        match self {
            ResourceStatus::Available => StatusDisplay {
                label: "Available",
                color: StatusColor::Green,
            },
            ResourceStatus::Rented => StatusDisplay {
                label: "Rented",
                color: StatusColor::Blue,
            },
            ResourceStatus::Maintenance => StatusDisplay {
                label: "Maintenance",
                color: StatusColor::Yellow,
            },
            ResourceStatus::Offline => StatusDisplay {
                label: "Offline",
                color: StatusColor::Gray,
            },
        }
    }
}

/// Lifecycle of a container launched on a rented node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Creating,
    Running,
    Stopped,
    Error,
    Deleted,
}

impl ContainerState {
    pub const ALL: [ContainerState; 5] = [
        ContainerState::Creating,
        ContainerState::Running,
        ContainerState::Stopped,
        ContainerState::Error,
        ContainerState::Deleted,
    ];

    /// No further transitions are expected from terminal states
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContainerState::Deleted)
    }

    pub fn display(&self) -> StatusDisplay {
        match self {
            ContainerState::Creating => StatusDisplay {
                label: "Creating",
                color: StatusColor::Blue,
            },
            ContainerState::Running => StatusDisplay {
                label: "Running",
                color: StatusColor::Green,
            },
            ContainerState::Stopped => StatusDisplay {
                label: "Stopped",
                color: StatusColor::Gray,
            },
            ContainerState::Error => StatusDisplay {
                label: "Error",
                color: StatusColor::Red,
            },
            ContainerState::Deleted => StatusDisplay {
                label: "Deleted",
                color: StatusColor::Gray,
            },
        }
    }
}

/// Display metadata for a health verdict
pub fn health_display(verdict: crate::HealthVerdict) -> StatusDisplay {
    match verdict {
        crate::HealthVerdict::Healthy => StatusDisplay {
            label: "Healthy",
            color: StatusColor::Green,
        },
        crate::HealthVerdict::Warning => StatusDisplay {
            label: "Warning",
            color: StatusColor::Yellow,
        },
        crate::HealthVerdict::Critical => StatusDisplay {
            label: "Critical",
            color: StatusColor::Red,
        },
    }
}

/// A region nodes can be rented in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub id: &'static str,
    pub name: &'static str,
    pub location: &'static str,
}

pub static REGIONS: &[Region] = &[
    Region {
        id: "us-east-1",
        name: "US East",
        location: "Virginia, USA",
    },
    Region {
        id: "us-west-2",
        name: "US West",
        location: "Oregon, USA",
    },
    Region {
        id: "eu-west-1",
        name: "EU West",
        location: "Dublin, Ireland",
    },
    Region {
        id: "eu-central-1",
        name: "EU Central",
        location: "Frankfurt, Germany",
    },
    Region {
        id: "ap-southeast-1",
        name: "Asia Pacific South-East",
        location: "Singapore",
    },
    Region {
        id: "ap-northeast-1",
        name: "Asia Pacific North-East",
        location: "Tokyo, Japan",
    },
];

pub fn region(id: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.id == id)
}
