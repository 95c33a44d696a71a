//! Telemetry value types shared by the engine, store and cockpit.

use serde::{Deserialize, Serialize};

/// One immutable telemetry observation. Unavailable channels are zero-filled,
/// never synthesized — a `0.0` disk rate may mean "no disk activity" or "disk
/// collector unavailable"; callers that need to distinguish those read the
/// collector's own availability flag, not the sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_read_bps: f64,
    pub disk_write_bps: f64,
    pub network_recv_bps: f64,
    pub network_sent_bps: f64,
}

impl Sample {
    pub fn zero(timestamp: f64) -> Self {
        Sample {
            timestamp,
            cpu_percent: 0.0,
            memory_percent: 0.0,
            disk_read_bps: 0.0,
            disk_write_bps: 0.0,
            network_recv_bps: 0.0,
            network_sent_bps: 0.0,
        }
    }
}

/// One process's telemetry for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_rss_bytes: u64,
}

impl ProcessSample {
    /// Names are fallback-stringified to `pid-<N>` when unavailable, and
    /// truncated to 260 bytes at a UTF-8 char boundary per the data model.
    pub fn named(pid: u32, name: Option<String>, cpu_percent: f64, memory_rss_bytes: u64) -> Self {
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("pid-{pid}"));
        let name = truncate_utf8(&name, 260);
        ProcessSample {
            pid,
            name,
            cpu_percent,
            memory_rss_bytes,
        }
    }
}

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// A list of thermal sensors, plus a convenience accessor for the hottest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalSensor {
    pub label: String,
    pub celsius: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuSample {
    pub available: bool,
    pub gpu_percent: f64,
    pub vram_percent: f64,
    pub vram_used_bytes: u64,
    pub vram_total_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskTelemetry {
    pub read_bps: f64,
    pub write_bps: f64,
    pub total_read_bytes: u64,
    pub total_write_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTelemetry {
    pub recv_bps: f64,
    pub sent_bps: f64,
    pub total_recv_bytes: u64,
    pub total_sent_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_sample_falls_back_to_pid_name() {
        let s = ProcessSample::named(42, None, 1.0, 100);
        assert_eq!(s.name, "pid-42");
    }

    #[test]
    fn process_sample_truncates_long_names_on_char_boundary() {
        let long_name = "x".repeat(300);
        let s = ProcessSample::named(1, Some(long_name), 0.0, 0);
        assert_eq!(s.name.len(), 260);
    }
}
