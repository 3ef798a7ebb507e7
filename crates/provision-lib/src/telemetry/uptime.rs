//! Heartbeat freshness, uptime percentage and uptime formatting

use chrono::{DateTime, Utc};

use crate::models::HeartbeatSample;
use crate::policy::HEARTBEAT_FRESHNESS_WINDOW;

/// Whether the last heartbeat is within the freshness window of now
pub fn is_heartbeat_fresh(last_updated_at: Option<DateTime<Utc>>) -> bool {
    is_heartbeat_fresh_at(last_updated_at, Utc::now())
}

/// Freshness relative to an explicit `now`; the window boundary is fresh
pub fn is_heartbeat_fresh_at(last_updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let Some(at) = last_updated_at else {
        return false;
    };
    match chrono::Duration::from_std(HEARTBEAT_FRESHNESS_WINDOW) {
        Ok(window) => now.signed_duration_since(at) <= window,
        Err(_) => false,
    }
}

/// Share of online samples in `history`, 0 when empty
pub fn calculate_uptime_percentage(history: &[HeartbeatSample]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let online = history.iter().filter(|s| s.is_online).count();
    100.0 * online as f64 / history.len() as f64
}

/// Human-readable uptime such as `45m`, `3h 20m` or `2d 4h`
///
/// Hours are converted to whole minutes (rounded) before formatting.
/// Day-scale values drop the minute remainder.
pub fn format_uptime(hours: f64) -> String {
    if hours.is_nan() || hours < 0.0 {
        return "0m".to_string();
    }

    let total_minutes = (hours * 60.0).round() as u64;
    if total_minutes < 60 {
        return format!("{}m", total_minutes);
    }

    let total_hours = total_minutes / 60;
    if total_hours < 24 {
        let minutes = total_minutes % 60;
        return if minutes == 0 {
            format!("{}h", total_hours)
        } else {
            format!("{}h {}m", total_hours, minutes)
        };
    }

    let days = total_hours / 24;
    let rem_hours = total_hours % 24;
    if rem_hours == 0 {
        format!("{}d", days)
    } else {
        format!("{}d {}h", days, rem_hours)
    }
}
