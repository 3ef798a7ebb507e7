//! Node branding
//!
//! This module provides:
//! - The MOTD banner, metadata file and prompt customization for a node
//! - Idempotent branding and cleanup scripts, plus a one-line form
//! - The branded deployment orchestration script and its outcome parser

mod injector;
mod orchestrator;

pub use injector::{
    generate_branding_oneliner, generate_branding_script, generate_cleanup_script, generate_motd,
    BrandingInjector, MOTD_PATH,
};
pub use orchestrator::{
    generate_branded_deployment_script, BrandedDeployment, BrandingMode, DeploymentPhase,
    OrchestrationOutcome, PollPolicy, BRANDING_APPLIED_MARKER, BRANDING_FAILED_MARKER,
    COMPLETE_MARKER, POLL_TIMEOUT_MARKER,
};
