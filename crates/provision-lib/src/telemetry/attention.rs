//! Operator attention aggregation
//!
//! Stricter than the health classifier: CPU and memory page above 90% and
//! GPU temperature above 85°C, independently of the coarse verdict.

use chrono::{DateTime, Utc};

use super::uptime::is_heartbeat_fresh_at;
use crate::models::{AttentionReport, HealthVerdict, HeartbeatSample};

pub const ATTENTION_CPU_PERCENT: f64 = 90.0;
pub const ATTENTION_MEMORY_PERCENT: f64 = 90.0;
pub const ATTENTION_GPU_TEMP_CELSIUS: f64 = 85.0;

/// Attention verdict for `sample` as of now
pub fn needs_attention(sample: &HeartbeatSample) -> AttentionReport {
    needs_attention_at(sample, Utc::now())
}

/// Attention verdict with an explicit `now`
///
/// Reasons are ordered: stale heartbeat, CPU, memory, GPU temperature,
/// critical stored health.
pub fn needs_attention_at(sample: &HeartbeatSample, now: DateTime<Utc>) -> AttentionReport {
    let mut reasons = Vec::new();

    if !is_heartbeat_fresh_at(sample.last_updated_at, now) {
        reasons.push("Heartbeat is stale (no update in the last 5 minutes)".to_string());
    }
    if let Some(cpu) = sample.cpu_usage_percent.filter(|v| *v > ATTENTION_CPU_PERCENT) {
        reasons.push(format!("High CPU usage: {:.1}%", cpu));
    }
    if let Some(memory) = sample
        .memory_usage_percent
        .filter(|v| *v > ATTENTION_MEMORY_PERCENT)
    {
        reasons.push(format!("High memory usage: {:.1}%", memory));
    }
    if let Some(temp) = sample
        .gpu_temp_celsius
        .filter(|v| *v > ATTENTION_GPU_TEMP_CELSIUS)
    {
        reasons.push(format!("High GPU temperature: {:.1}°C", temp));
    }
    if sample.health == Some(HealthVerdict::Critical) {
        reasons.push("Health status is critical".to_string());
    }

    AttentionReport::from_reasons(reasons)
}
