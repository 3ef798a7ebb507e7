//! Heartbeat telemetry evaluation
//!
//! This module provides:
//! - Per-sample health classification
//! - Freshness, uptime percentage and uptime formatting
//! - The operator attention verdict
//! - A summary over a heartbeat history

mod attention;
mod health;
mod uptime;


pub use attention::{
    needs_attention, needs_attention_at, ATTENTION_CPU_PERCENT, ATTENTION_GPU_TEMP_CELSIUS,
    ATTENTION_MEMORY_PERCENT,
};
pub use health::{
    determine_health, CPU_CRITICAL_PERCENT, CPU_WARNING_PERCENT, GPU_TEMP_CRITICAL_CELSIUS,
    GPU_TEMP_WARNING_CELSIUS, MEMORY_CRITICAL_PERCENT, MEMORY_WARNING_PERCENT,
};
pub use uptime::{
    calculate_uptime_percentage, format_uptime, is_heartbeat_fresh, is_heartbeat_fresh_at,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AttentionReport, HealthVerdict, HeartbeatSample};

/// Evaluation of a heartbeat history, anchored on its latest sample
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatSummary {
    pub samples: usize,
    pub uptime_percentage: f64,
    /// Verdict of the most recent sample
    pub latest_health: Option<HealthVerdict>,
    pub fresh: bool,
    pub attention: AttentionReport,
}

pub fn summarize(history: &[HeartbeatSample]) -> HeartbeatSummary {
    summarize_at(history, Utc::now())
}

/// Summary with an explicit `now`; an empty history is stale
pub fn summarize_at(history: &[HeartbeatSample], now: DateTime<Utc>) -> HeartbeatSummary {
    // Ties on created_at resolve to the later entry
    let latest = history.iter().max_by_key(|s| s.created_at);

    let attention = match latest {
        Some(sample) => needs_attention_at(sample, now),
        None => AttentionReport::from_reasons(vec![
            "No heartbeat received".to_string(),
        ]),
    };

    HeartbeatSummary {
        samples: history.len(),
        uptime_percentage: calculate_uptime_percentage(history),
        latest_health: latest.map(determine_health),
        fresh: latest.is_some_and(|s| is_heartbeat_fresh_at(s.last_updated_at, now)),
        attention,
    }
}
