//! Collaborator interfaces
//!
//! The subsystem never runs anything itself. Generated scripts are handed to
//! a [`NodeExecutor`] and heartbeat samples arrive from a [`HeartbeatSource`];
//! both are supplied by the embedding service.

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::branding::{BrandedDeployment, OrchestrationOutcome};
use crate::error::{ProvisionError, Result};
use crate::models::HeartbeatSample;
use crate::observability::StructuredLogger;
use crate::telemetry::{summarize_at, HeartbeatSummary};

/// Captured result of running a script on a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Transport that runs opaque scripts on a node
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Run `script` on `node` and wait for it to finish
    async fn execute(&self, node: &str, script: &str) -> AnyResult<ExecOutput>;
}

/// Stream of heartbeat samples for one resource
#[async_trait]
pub trait HeartbeatSource: Send {
    /// Next batch of samples; an empty batch means the source is drained
    async fn next_batch(&mut self) -> AnyResult<Vec<HeartbeatSample>>;
}

/// Run a branded deployment through `executor`
///
/// A poll timeout is reported in the outcome and logged as a warning. Only
/// transport failures and a non-zero exit status become errors.
pub async fn run_branded_deployment(
    executor: &dyn NodeExecutor,
    node: &str,
    plan: &BrandedDeployment,
) -> Result<OrchestrationOutcome> {
    let container = plan.launch().container_name().to_string();
    debug!(node = %node, container = %container, "Submitting branded deployment");

    let output = executor
        .execute(node, &plan.script())
        .await
        .map_err(|e| ProvisionError::execution(format!("{}: {}", node, e)))?;

    if !output.success() {
        return Err(ProvisionError::execution(format!(
            "{}: script exited with status {}: {}",
            node,
            output.exit_code,
            output.stderr.trim()
        )));
    }

    let outcome = OrchestrationOutcome::from_output(&output.stdout);
    let logger = StructuredLogger::new(node);
    if outcome.poll_timed_out {
        logger.log_poll_timeout(&container, plan.poll().max_attempts, plan.poll().interval_secs);
    }
    if !outcome.branding_applied {
        warn!(
            event = "branding_failed",
            node = %node,
            container = %container,
            "Branding did not apply inside the container"
        );
    }
    Ok(outcome)
}

/// Drain `source` and summarize every sample it yields
///
/// Stops after `max_batches` batches even if the source is not drained.
pub async fn collect_heartbeats(
    source: &mut dyn HeartbeatSource,
    max_batches: usize,
    now: DateTime<Utc>,
) -> AnyResult<HeartbeatSummary> {
    let mut history = Vec::new();
    for _ in 0..max_batches {
        let batch = source.next_batch().await?;
        if batch.is_empty() {
            break;
        }
        history.extend(batch);
    }
    debug!(samples = history.len(), "Collected heartbeat history");
    Ok(summarize_at(&history, now))
}
