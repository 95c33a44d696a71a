//! Opaque-handle boundaries between the controller and its three
//! collaborators: production code selects a concrete implementation at
//! construction, tests inject a fake.

use crate::cockpit::timeline::TimelinePoint;
use crate::error::{AppError, Result};
use crate::telemetry::sample::{DiskTelemetry, GpuSample, NetworkTelemetry, ProcessSample, Sample, ThermalSensor};
use crate::telemetry::TelemetryEngine;

/// Everything the controller needs from one telemetry tick.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub sample: Sample,
    pub top_processes: Vec<ProcessSample>,
    pub disk: DiskTelemetry,
    pub network: NetworkTelemetry,
    pub thermal: Vec<ThermalSensor>,
    pub gpu: GpuSample,
}

pub trait TelemetryBridge {
    fn collect(&mut self, timestamp: f64, process_limit: usize) -> Result<TelemetrySnapshot>;
}

pub struct EngineTelemetryBridge {
    engine: TelemetryEngine,
}

impl EngineTelemetryBridge {
    pub fn new() -> Self {
        EngineTelemetryBridge {
            engine: TelemetryEngine::new(),
        }
    }
}

impl Default for EngineTelemetryBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryBridge for EngineTelemetryBridge {
    fn collect(&mut self, timestamp: f64, process_limit: usize) -> Result<TelemetrySnapshot> {
        let mut sample = self.engine.collect_system(timestamp)?;
        let disk = self.engine.collect_disk(timestamp)?;
        let network = self.engine.collect_network(timestamp)?;
        sample.disk_read_bps = disk.read_bps;
        sample.disk_write_bps = disk.write_bps;
        sample.network_recv_bps = network.recv_bps;
        sample.network_sent_bps = network.sent_bps;

        Ok(TelemetrySnapshot {
            sample,
            top_processes: self.engine.collect_top_processes(process_limit)?,
            disk,
            network,
            thermal: self.engine.collect_thermal(timestamp),
            gpu: self.engine.collect_gpu(timestamp),
        })
    }
}

pub trait DvrBridge {
    fn query_timeline(&self, start: Option<f64>, end: Option<f64>, resolution: usize) -> Result<Vec<TimelinePoint>>;
}

pub struct StoreDvrBridge {
    store: std::sync::Arc<crate::store::DvrStore>,
}

impl StoreDvrBridge {
    pub fn new(store: std::sync::Arc<crate::store::DvrStore>) -> Self {
        StoreDvrBridge { store }
    }
}

impl DvrBridge for StoreDvrBridge {
    fn query_timeline(&self, start: Option<f64>, end: Option<f64>, resolution: usize) -> Result<Vec<TimelinePoint>> {
        let samples = self.store.query_timeline(start, end, resolution)?;
        Ok(samples.iter().map(TimelinePoint::from).collect())
    }
}

pub trait RenderBridge {
    fn format_snapshot_lines(&self, snapshot: &TelemetrySnapshot) -> Result<Vec<String>>;
    fn format_process_row(&self, process: &ProcessSample) -> Result<String>;
    fn format_stream_status(&self, degraded: bool, detail: &str) -> Result<String>;
    fn format_disk_rate(&self, read_bps: f64, write_bps: f64) -> Result<String>;
    fn format_network_rate(&self, recv_bps: f64, sent_bps: f64) -> Result<String>;
}

/// The production render bridge: pure formatting functions that never panic,
/// degrading to a fixed fallback string on non-finite input rather than
/// returning an error.
pub struct FallbackRenderBridge;

impl RenderBridge for FallbackRenderBridge {
    fn format_snapshot_lines(&self, snapshot: &TelemetrySnapshot) -> Result<Vec<String>> {
        Ok(vec![
            format!("cpu {:.1}%", safe_percent(snapshot.sample.cpu_percent)),
            format!("mem {:.1}%", safe_percent(snapshot.sample.memory_percent)),
        ])
    }

    fn format_process_row(&self, process: &ProcessSample) -> Result<String> {
        Ok(format!(
            "{:>6} {:<20.20} {:>5.1}% {:>8}KB",
            process.pid,
            process.name,
            safe_percent(process.cpu_percent),
            process.memory_rss_bytes / 1024
        ))
    }

    fn format_stream_status(&self, degraded: bool, detail: &str) -> Result<String> {
        if degraded {
            Ok(format!("degraded: {detail}"))
        } else {
            Ok("ok".to_string())
        }
    }

    fn format_disk_rate(&self, read_bps: f64, write_bps: f64) -> Result<String> {
        Ok(format!(
            "r {} /s  w {} /s",
            human_bytes(read_bps),
            human_bytes(write_bps)
        ))
    }

    fn format_network_rate(&self, recv_bps: f64, sent_bps: f64) -> Result<String> {
        Ok(format!(
            "down {} /s  up {} /s",
            human_bytes(recv_bps),
            human_bytes(sent_bps)
        ))
    }
}

fn safe_percent(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn human_bytes(bps: f64) -> String {
    let bps = if bps.is_finite() { bps.max(0.0) } else { 0.0 };
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bps;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", UNITS[unit])
}

/// Deterministic fallback used by the controller when the render bridge
/// itself reports a failure.
pub const FALLBACK_LINE: &str = "-- unavailable --";

/// A fake telemetry bridge for controller tests; always returns a
/// pre-built snapshot or a configured error.
pub struct FakeTelemetryBridge {
    pub next: std::cell::RefCell<Option<Result<TelemetrySnapshot>>>,
}

impl FakeTelemetryBridge {
    pub fn new() -> Self {
        FakeTelemetryBridge {
            next: std::cell::RefCell::new(None),
        }
    }

    pub fn set_next(&self, result: Result<TelemetrySnapshot>) {
        *self.next.borrow_mut() = Some(result);
    }
}

impl Default for FakeTelemetryBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryBridge for FakeTelemetryBridge {
    fn collect(&mut self, timestamp: f64, _process_limit: usize) -> Result<TelemetrySnapshot> {
        self.next
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Ok(empty_snapshot(timestamp)))
    }
}

fn empty_snapshot(timestamp: f64) -> TelemetrySnapshot {
    TelemetrySnapshot {
        sample: Sample::zero(timestamp),
        top_processes: Vec::new(),
        disk: DiskTelemetry::default(),
        network: NetworkTelemetry::default(),
        thermal: Vec::new(),
        gpu: GpuSample::default(),
    }
}

/// Receives telemetry snapshots produced by a separate poller thread over a
/// bounded, latest-value channel between the poller thread and the
/// render/controller thread. `collect` drains the channel to its newest
/// pending value and caches it; if nothing new has arrived since the last
/// tick it replays the cached snapshot so the controller never blocks
/// waiting on the poller.
pub struct ChannelTelemetryBridge {
    receiver: crossbeam_channel::Receiver<TelemetrySnapshot>,
    cached: Option<TelemetrySnapshot>,
}

impl ChannelTelemetryBridge {
    pub fn new(receiver: crossbeam_channel::Receiver<TelemetrySnapshot>) -> Self {
        ChannelTelemetryBridge { receiver, cached: None }
    }
}

impl TelemetryBridge for ChannelTelemetryBridge {
    fn collect(&mut self, _timestamp: f64, _process_limit: usize) -> Result<TelemetrySnapshot> {
        while let Ok(snapshot) = self.receiver.try_recv() {
            self.cached = Some(snapshot);
        }
        self.cached
            .clone()
            .ok_or_else(|| AppError::Unavailable("no telemetry snapshot received yet".into()))
    }
}

/// A fake DVR bridge for controller tests.
pub struct FakeDvrBridge {
    pub points: Vec<TimelinePoint>,
    pub fail: bool,
}

impl DvrBridge for FakeDvrBridge {
    fn query_timeline(&self, _start: Option<f64>, _end: Option<f64>, resolution: usize) -> Result<Vec<TimelinePoint>> {
        if self.fail {
            return Err(AppError::Unavailable("dvr bridge unavailable".into()));
        }
        Ok(crate::store::downsample_lttb(
            &self
                .points
                .iter()
                .map(|p| Sample {
                    timestamp: p.timestamp,
                    cpu_percent: p.cpu_percent,
                    memory_percent: p.memory_percent,
                    ..Sample::zero(p.timestamp)
                })
                .collect::<Vec<_>>(),
            resolution.max(3),
        )
        .iter()
        .map(TimelinePoint::from)
        .collect())
    }
}
