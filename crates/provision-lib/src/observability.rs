//! Observability infrastructure for the provisioning service
//!
//! Provides:
//! - Prometheus metrics (rendered artifacts, render latency, validation errors, health verdicts)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{AttentionReport, HealthVerdict};

/// Histogram buckets for render latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ProvisionMetricsInner> = OnceLock::new();

struct ProvisionMetricsInner {
    artifacts_rendered: IntCounterVec,
    render_latency_seconds: Histogram,
    validation_errors: IntCounter,
    health_verdicts: IntCounterVec,
    attention_flags: IntCounter,
}

impl ProvisionMetricsInner {
    fn new() -> Self {
        Self {
            artifacts_rendered: register_int_counter_vec!(
                "node_provisioner_artifacts_rendered_total",
                "Deployment and branding artifacts rendered, by kind",
                &["kind"]
            )
            .expect("Failed to register artifacts_rendered"),

            render_latency_seconds: register_histogram!(
                "node_provisioner_render_latency_seconds",
                "Time spent rendering a deployment request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register render_latency_seconds"),

            validation_errors: register_int_counter!(
                "node_provisioner_validation_errors_total",
                "Deployment requests rejected before rendering"
            )
            .expect("Failed to register validation_errors"),

            health_verdicts: register_int_counter_vec!(
                "node_provisioner_health_verdicts_total",
                "Heartbeat samples classified, by verdict",
                &["verdict"]
            )
            .expect("Failed to register health_verdicts"),

            attention_flags: register_int_counter!(
                "node_provisioner_attention_flags_total",
                "Heartbeat samples that needed operator attention"
            )
            .expect("Failed to register attention_flags"),
        }
    }
}

/// Provisioning metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ProvisionMetrics {
    _private: (),
}

impl Default for ProvisionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisionMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ProvisionMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ProvisionMetricsInner {
        GLOBAL_METRICS.get_or_init(ProvisionMetricsInner::new)
    }

    /// Count one rendered artifact (`command`, `manifest`, `script`, ...)
    pub fn inc_artifact(&self, kind: &str) {
        self.inner()
            .artifacts_rendered
            .with_label_values(&[kind])
            .inc();
    }

    pub fn observe_render_latency(&self, duration_secs: f64) {
        self.inner().render_latency_seconds.observe(duration_secs);
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors.inc();
    }

    pub fn record_verdict(&self, verdict: HealthVerdict) {
        self.inner()
            .health_verdicts
            .with_label_values(&[verdict.as_str()])
            .inc();
    }

    pub fn inc_attention_flags(&self) {
        self.inner().attention_flags.inc();
    }
}

/// Structured logger for provisioning events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "provisioner_started",
            node = %self.node_name,
            version = %version,
            port = port,
            "Provisioning service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "provisioner_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Provisioning service shutting down"
        );
    }

    /// Log a rendered deployment
    pub fn log_render(&self, container_name: &str, image: &str, gpu_count: u32, with_script: bool) {
        info!(
            event = "deployment_rendered",
            node = %self.node_name,
            container_name = %container_name,
            image = %image,
            gpu_count = gpu_count,
            with_script = with_script,
            "Rendered deployment artifacts"
        );
    }

    /// Log a rejected deployment request
    pub fn log_validation_error(&self, error: &str) {
        warn!(
            event = "deployment_rejected",
            node = %self.node_name,
            error = %error,
            "Deployment request failed validation"
        );
    }

    /// Log a health verdict; critical verdicts are warnings
    pub fn log_verdict(&self, resource: &str, verdict: HealthVerdict) {
        match verdict {
            HealthVerdict::Critical => {
                warn!(
                    event = "health_evaluated",
                    node = %self.node_name,
                    resource = %resource,
                    verdict = %verdict,
                    "Resource health is critical"
                );
            }
            _ => {
                info!(
                    event = "health_evaluated",
                    node = %self.node_name,
                    resource = %resource,
                    verdict = %verdict,
                    "Resource health evaluated"
                );
            }
        }
    }

    /// Log an attention verdict that needs an operator
    pub fn log_attention(&self, resource: &str, report: &AttentionReport) {
        if !report.needs_attention {
            return;
        }
        warn!(
            event = "attention_required",
            node = %self.node_name,
            resource = %resource,
            reasons = %report.reasons.join("; "),
            "Resource needs operator attention"
        );
    }

    /// Log a running-state poll that ran out of attempts
    pub fn log_poll_timeout(&self, container_name: &str, max_attempts: u32, interval_secs: u32) {
        warn!(
            event = "poll_timeout",
            node = %self.node_name,
            container_name = %container_name,
            max_attempts = max_attempts,
            interval_secs = interval_secs,
            "Container not running after polling; branding applied anyway"
        );
    }
}
