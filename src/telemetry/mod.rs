//! Telemetry Engine: stateful collectors over raw system counters.
//!
//! One struct produces one tick's readings. Process enumeration (pid/name/
//! rss) comes from `sysinfo`; CPU counters come from `/proc` directly (see
//! `linux_proc`) so the engine controls the exact delta math instead of
//! trusting a pre-smoothed percentage.

pub mod baseline;
mod gpu;
mod linux_proc;
pub mod process;
pub mod sample;
mod thermal;

use crate::error::{AppError, Result};
use baseline::{sanitize_percent, CounterBaseline, KernelUserIdleBaseline};
use process::ProcessStateCache;
use sample::{DiskTelemetry, GpuSample, NetworkTelemetry, ProcessSample, Sample, ThermalSensor};
use sysinfo::{Networks, System};

pub use gpu::collect_gpu as collect_gpu_raw;
pub use thermal::{collect_thermal as collect_thermal_raw, hottest};

pub struct TelemetryEngine {
    sys: System,
    networks: Networks,
    system_cpu: KernelUserIdleBaseline,
    per_core_cpu: Vec<KernelUserIdleBaseline>,
    disk_baseline: (CounterBaseline, CounterBaseline),
    network_baseline: (CounterBaseline, CounterBaseline),
    process_states: ProcessStateCache,
    logical_cpu_count: u64,
}

impl TelemetryEngine {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let logical_cpu_count = sys.cpus().len().max(1) as u64;
        TelemetryEngine {
            sys,
            networks: Networks::new_with_refreshed_list(),
            system_cpu: KernelUserIdleBaseline::new(),
            per_core_cpu: Vec::new(),
            disk_baseline: (CounterBaseline::new(), CounterBaseline::new()),
            network_baseline: (CounterBaseline::new(), CounterBaseline::new()),
            process_states: ProcessStateCache::new(),
            logical_cpu_count,
        }
    }

    fn refresh(&mut self) {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        self.networks.refresh(true);
    }

    /// `{cpu%, mem%}` clamped to `[0,100]`.
    pub fn collect_system(&mut self, timestamp: f64) -> Result<Sample> {
        if !timestamp.is_finite() {
            return Err(AppError::InvalidArgument("timestamp must be finite".into()));
        }
        self.refresh();

        let cpu_percent = match linux_proc::read_system_cpu_counters() {
            Some((kernel, user, idle)) => self.system_cpu.advance(kernel, user, idle),
            None => 0.0,
        };

        let total_memory = self.sys.total_memory();
        let memory_percent = if total_memory > 0 {
            sanitize_percent((self.sys.used_memory() as f64 / total_memory as f64) * 100.0)
        } else {
            0.0
        };

        Ok(Sample {
            timestamp,
            cpu_percent,
            memory_percent,
            ..Sample::zero(timestamp)
        })
    }

    /// Ranked process samples, `limit` inclusive cap; never fails — an
    /// enumeration error degrades to an empty list rather than `unavailable`,
    /// since the data model treats absent collectors as zero-filled.
    pub fn collect_top_processes(&mut self, limit: usize) -> Result<Vec<ProcessSample>> {
        if limit == 0 {
            return Err(AppError::InvalidArgument("limit must be > 0".into()));
        }
        self.refresh();

        let mut observed_pids = Vec::with_capacity(self.sys.processes().len());
        let mut samples = Vec::with_capacity(self.sys.processes().len());

        for (pid, process) in self.sys.processes() {
            let pid_u32 = pid.as_u32();
            observed_pids.push(pid_u32);

            let cpu_percent = match linux_proc::read_process_cpu_counters(pid_u32) {
                Some((total_100ns, create_time_100ns)) => self.process_states.advance_cpu(
                    pid_u32,
                    create_time_100ns,
                    total_100ns,
                    (crate::clock::monotonic_seconds() * 10_000_000.0) as u64,
                    self.logical_cpu_count,
                ),
                None => 0.0,
            };

            samples.push(ProcessSample::named(
                pid_u32,
                Some(process.name().to_string_lossy().to_string()),
                cpu_percent,
                process.memory(),
            ));
        }

        self.process_states.prune(&observed_pids);
        Ok(process::top_k(samples, limit))
    }

    /// Rates + cumulative totals from `/proc/diskstats`; unavailable
    /// surfaces as zero rates, not a failure.
    pub fn collect_disk(&mut self, timestamp: f64) -> Result<DiskTelemetry> {
        if !timestamp.is_finite() {
            return Err(AppError::InvalidArgument("timestamp must be finite".into()));
        }
        let (total_read, total_write) = linux_proc::read_diskstats_totals();
        let read_bps = self.disk_baseline.0.advance(timestamp, total_read);
        let write_bps = self.disk_baseline.1.advance(timestamp, total_write);
        Ok(DiskTelemetry {
            read_bps,
            write_bps,
            total_read_bytes: total_read,
            total_write_bytes: total_write,
        })
    }

    /// Rates + cumulative totals summed across network interfaces.
    pub fn collect_network(&mut self, timestamp: f64) -> Result<NetworkTelemetry> {
        if !timestamp.is_finite() {
            return Err(AppError::InvalidArgument("timestamp must be finite".into()));
        }
        self.networks.refresh(true);
        let (total_recv, total_sent) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(recv, sent), (_, data)| {
                (recv + data.total_received(), sent + data.total_transmitted())
            });

        let recv_bps = self.network_baseline.0.advance(timestamp, total_recv);
        let sent_bps = self.network_baseline.1.advance(timestamp, total_sent);
        Ok(NetworkTelemetry {
            recv_bps,
            sent_bps,
            total_recv_bytes: total_recv,
            total_sent_bytes: total_sent,
        })
    }

    /// Never fails: missing sensors yield an empty list.
    pub fn collect_thermal(&self, _timestamp: f64) -> Vec<ThermalSensor> {
        thermal::collect_thermal()
    }

    /// Never fails: missing per-core counters yield an empty vector.
    pub fn collect_per_core(&mut self, _timestamp: f64) -> Vec<f64> {
        let cores = linux_proc::read_per_core_cpu_counters();
        if self.per_core_cpu.len() < cores.len() {
            self.per_core_cpu
                .resize(cores.len(), KernelUserIdleBaseline::new());
        }
        cores
            .into_iter()
            .map(|(index, kernel, user, idle)| self.per_core_cpu[index].advance(kernel, user, idle))
            .collect()
    }

    /// Never fails: missing GPU telemetry yields `available = false`.
    pub fn collect_gpu(&self, _timestamp: f64) -> GpuSample {
        gpu::collect_gpu()
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new()
    }
}
