//! Heartbeat evaluation commands

use anyhow::{Context as _, Result};
use chrono::Utc;
use colored::Colorize;
use provision_lib::{
    policy::health_display,
    telemetry::{determine_health, format_uptime, needs_attention_at, summarize_at},
    HeartbeatSample,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_status, color_uptime, format_celsius, format_percent, print_json, print_warning,
    OutputFormat,
};

/// Accepted heartbeat file layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum HeartbeatFile {
    Samples(Vec<HeartbeatSample>),
    Wrapped { samples: Vec<HeartbeatSample> },
}

impl HeartbeatFile {
    fn into_samples(self) -> Vec<HeartbeatSample> {
        match self {
            HeartbeatFile::Samples(samples) | HeartbeatFile::Wrapped { samples } => samples,
        }
    }
}

/// Row for the heartbeat table
#[derive(Tabled, Serialize)]
struct SampleRow {
    #[tabled(rename = "Created")]
    created_at: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "GPU Temp")]
    gpu_temp: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Attention")]
    attention: String,
}

/// Evaluate every sample in a heartbeat file and print a summary
pub async fn evaluate_file(path: &Path, format: OutputFormat) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let samples = serde_json::from_str::<HeartbeatFile>(&content)
        .context("Failed to parse heartbeat samples")?
        .into_samples();

    let now = Utc::now();
    let summary = summarize_at(&samples, now);

    match format {
        OutputFormat::Json => {
            let evaluations: Vec<_> = samples
                .iter()
                .map(|s| {
                    json!({
                        "health": determine_health(s),
                        "attention": needs_attention_at(s, now),
                    })
                })
                .collect();
            print_json(&json!({ "samples": evaluations, "summary": summary }));
        }
        OutputFormat::Table => {
            if samples.is_empty() {
                print_warning("No heartbeat samples found");
                return Ok(());
            }

            let rows: Vec<SampleRow> = samples
                .iter()
                .map(|s| {
                    let attention = needs_attention_at(s, now);
                    SampleRow {
                        created_at: s.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        online: if s.is_online { "yes" } else { "no" }.to_string(),
                        cpu: format_percent(s.cpu_usage_percent),
                        memory: format_percent(s.memory_usage_percent),
                        gpu_temp: format_celsius(s.gpu_temp_celsius),
                        health: color_status(health_display(determine_health(s))),
                        attention: if attention.needs_attention {
                            attention.reasons.join("; ").red().to_string()
                        } else {
                            "-".to_string()
                        },
                    }
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            println!();
            println!("{}", "Summary".bold());
            println!("{}", "=".repeat(40));
            println!("Samples:       {}", summary.samples);
            println!("Uptime:        {}", color_uptime(summary.uptime_percentage));
            if let Some(verdict) = summary.latest_health {
                println!("Latest health: {}", color_status(health_display(verdict)));
            }
            println!(
                "Fresh:         {}",
                if summary.fresh { "yes".green() } else { "no".red() }
            );
            for reason in &summary.attention.reasons {
                print_warning(reason);
            }
        }
    }

    Ok(())
}

/// Print a duration in hours as an uptime string
pub fn show_uptime(hours: f64, format: OutputFormat) {
    let uptime = format_uptime(hours);
    match format {
        OutputFormat::Json => print_json(&json!({ "hours": hours, "uptime": uptime })),
        OutputFormat::Table => println!("{}", uptime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_file_layouts() {
        let bare = r#"[{"isOnline": true, "createdAt": "2026-10-16T12:00:00Z"}]"#;
        let wrapped = r#"{"samples": [{"isOnline": false, "createdAt": "2026-10-16T12:00:00Z"}]}"#;

        let samples = serde_json::from_str::<HeartbeatFile>(bare).unwrap().into_samples();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].is_online);

        let samples = serde_json::from_str::<HeartbeatFile>(wrapped).unwrap().into_samples();
        assert!(!samples[0].is_online);
    }
}
