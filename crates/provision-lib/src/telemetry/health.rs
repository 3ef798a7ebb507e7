//! Per-sample health classification

use crate::models::{HealthVerdict, HeartbeatSample};

/// CPU usage above which a sample is critical
pub const CPU_CRITICAL_PERCENT: f64 = 95.0;
/// Memory usage above which a sample is critical
pub const MEMORY_CRITICAL_PERCENT: f64 = 95.0;
/// GPU temperature above which a sample is critical
pub const GPU_TEMP_CRITICAL_CELSIUS: f64 = 90.0;

pub const CPU_WARNING_PERCENT: f64 = 80.0;
pub const MEMORY_WARNING_PERCENT: f64 = 85.0;
pub const GPU_TEMP_WARNING_CELSIUS: f64 = 80.0;

/// Classify one heartbeat sample
///
/// Offline always wins. Thresholds are strict, and a missing metric counts
/// as zero so absence alone never degrades the verdict.
pub fn determine_health(sample: &HeartbeatSample) -> HealthVerdict {
    if !sample.is_online {
        return HealthVerdict::Critical;
    }

    let cpu = metric(sample.cpu_usage_percent);
    let memory = metric(sample.memory_usage_percent);
    let gpu_temp = metric(sample.gpu_temp_celsius);

    if cpu > CPU_CRITICAL_PERCENT
        || memory > MEMORY_CRITICAL_PERCENT
        || gpu_temp > GPU_TEMP_CRITICAL_CELSIUS
    {
        HealthVerdict::Critical
    } else if cpu > CPU_WARNING_PERCENT
        || memory > MEMORY_WARNING_PERCENT
        || gpu_temp > GPU_TEMP_WARNING_CELSIUS
    {
        HealthVerdict::Warning
    } else {
        HealthVerdict::Healthy
    }
}

/// Missing or NaN readings compare as zero
pub(crate) fn metric(value: Option<f64>) -> f64 {
    match value {
        Some(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}
