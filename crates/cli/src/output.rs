// SPDX-License-Identifier: MIT

//! Shared output formatting: text vs. JSON, status tables, uptime strings.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Either print `value` as pretty JSON, or run `text` for the human-facing
/// rendering, depending on `format`.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => text(),
    }
    Ok(())
}

pub fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Render the `status` table: name, status, pid, uptime, peer-port.
pub fn print_status_table(rows: &[(String, oa_core::AgentProcessRecord)]) {
    if rows.is_empty() {
        println!("No agents registered.");
        return;
    }
    println!("{:<16} {:<10} {:>8} {:>10} {:>6}", "NAME", "STATUS", "PID", "UPTIME", "PORT");
    for (name, record) in rows {
        let pid = record.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let uptime = record
            .started_at_ms
            .map(|started| {
                let now_ms = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
                format_uptime(now_ms.saturating_sub(started) / 1000)
            })
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<10} {:>8} {:>10} {:>6}",
            name,
            crate::color::status(&record.status.to_string()),
            pid,
            uptime,
            record.descriptor.port,
        );
    }
}
