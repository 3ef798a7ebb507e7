//! Error types for deployment validation and artifact rendering

use thiserror::Error;

/// Provisioning result type
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors raised before any artifact is generated
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Deployment request without an image reference
    #[error("deployment image must not be empty")]
    EmptyImage,

    /// Port outside the valid 1..=65535 range
    #[error("invalid port {0}: ports must be between 1 and 65535")]
    InvalidPort(u16),

    /// Environment key that cannot be injected into a container
    #[error("invalid environment variable name {0:?}")]
    InvalidEnvKey(String),

    /// Volume mount not in `host:container` form
    #[error("invalid volume mount {0:?}: expected host:container")]
    InvalidVolume(String),

    /// Name rejected by the container runtime naming rules
    #[error("invalid container name {0:?}")]
    InvalidContainerName(String),

    #[error("template name must not be empty")]
    EmptyTemplateName,

    #[error("user id must not be empty")]
    EmptyUserId,

    /// Command override that does not parse as shell words
    #[error("invalid command override {0:?}: unbalanced quoting")]
    InvalidCommand(String),

    /// Template id not present in the catalog
    #[error("unknown template {0:?}")]
    UnknownTemplate(String),

    /// Manifest serialization failure
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_yaml::Error),

    /// Metadata serialization failure
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Node execution agent reported a failure
    #[error("execution error: {0}")]
    Execution(String),
}

impl ProvisionError {
    /// Create an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Returns true for errors caused by malformed caller input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProvisionError::EmptyImage
                | ProvisionError::InvalidPort(_)
                | ProvisionError::InvalidEnvKey(_)
                | ProvisionError::InvalidVolume(_)
                | ProvisionError::InvalidContainerName(_)
                | ProvisionError::EmptyTemplateName
                | ProvisionError::EmptyUserId
                | ProvisionError::UnknownTemplate(_)
                | ProvisionError::InvalidCommand(_)
        )
    }
}
