//! Cockpit Controller & Style Sequencer: the frame-paced orchestrator.
//!
//! Holds its telemetry/store/render collaborators as trait objects and runs
//! a strictly ordered 8-step pipeline once per tick: collect, smooth,
//! advance phase, compute accent intensity, derive style tokens, select a
//! timeline source, format display strings, publish.

pub mod bridges;
pub mod smoothing;
pub mod style;
pub mod timeline;

use bridges::{DvrBridge, RenderBridge, TelemetryBridge, FALLBACK_LINE};
use smoothing::AsymmetricEma;
use style::{compute_accent_intensity, derive_style_tokens, FrameDiscipline, RollingVariance, StyleTokens};
use timeline::{LiveTimelineRing, TimelinePoint, TimelineSource};

use crate::telemetry::sample::ProcessSample;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CockpitUiState {
    pub smoothed_cpu_percent: f64,
    pub smoothed_memory_percent: f64,
    pub cpu_line: String,
    pub memory_line: String,
    pub timestamp_line: String,
    pub process_rows: Vec<String>,
    pub status_line: String,
    pub timeline_line: String,
    pub timeline: Vec<TimelinePoint>,
    pub timeline_source: TimelineSource,
    pub style: StyleTokens,
    pub degraded: bool,
    pub telemetry_available: bool,
    pub render_available: bool,
}

pub struct CockpitConfig {
    pub rise_half_life: f64,
    pub fall_half_life: f64,
    pub pulse_hz: f64,
    pub pulse_strength: f64,
    pub accent_floor: f64,
    pub accent_ceiling: f64,
    pub discipline: FrameDiscipline,
    pub timeline_window_seconds: f64,
    pub timeline_live_capacity: usize,
    pub timeline_resolution: usize,
    pub dvr_refresh_ticks: u64,
    pub prefer_dvr_timeline: bool,
    pub process_limit: usize,
    pub variance_window: usize,
    pub variance_scale: f64,
}

impl Default for CockpitConfig {
    fn default() -> Self {
        CockpitConfig {
            rise_half_life: 0.4,
            fall_half_life: 1.2,
            pulse_hz: 0.15,
            pulse_strength: 0.1,
            accent_floor: 0.15,
            accent_ceiling: 0.95,
            discipline: FrameDiscipline {
                target_fps: 60.0,
                max_catchup_frames: 4,
            },
            timeline_window_seconds: 300.0,
            timeline_live_capacity: 512,
            timeline_resolution: 64,
            dvr_refresh_ticks: 30,
            prefer_dvr_timeline: false,
            process_limit: 8,
            variance_window: 32,
            variance_scale: 400.0,
        }
    }
}

pub struct CockpitController {
    telemetry: Box<dyn TelemetryBridge>,
    render: Box<dyn RenderBridge>,
    dvr: Option<Box<dyn DvrBridge>>,
    db_configured: bool,

    config: CockpitConfig,
    cpu_ema: AsymmetricEma,
    mem_ema: AsymmetricEma,
    phase: f64,
    live_ring: LiveTimelineRing,
    dvr_cache: Vec<TimelinePoint>,
    dvr_cache_tick: u64,
    variance: RollingVariance,
    tick_count: u64,
    last_good: Option<CockpitUiState>,
}

impl CockpitController {
    pub fn new(
        telemetry: Box<dyn TelemetryBridge>,
        render: Box<dyn RenderBridge>,
        dvr: Option<Box<dyn DvrBridge>>,
        db_configured: bool,
        config: CockpitConfig,
    ) -> Self {
        CockpitController {
            telemetry,
            render,
            dvr,
            db_configured,
            cpu_ema: AsymmetricEma::new(config.rise_half_life, config.fall_half_life),
            mem_ema: AsymmetricEma::new(config.rise_half_life, config.fall_half_life),
            live_ring: LiveTimelineRing::new(config.timeline_live_capacity, config.timeline_window_seconds),
            variance: RollingVariance::new(config.variance_window),
            phase: 0.0,
            dvr_cache: Vec::new(),
            dvr_cache_tick: 0,
            tick_count: 0,
            last_good: None,
            config,
        }
    }

    /// Runs the strictly ordered 8-step per-tick pipeline and publishes the
    /// resulting `CockpitUiState`.
    pub fn tick(&mut self, now: f64, delta_time_actual: f64) -> CockpitUiState {
        self.tick_count += 1;
        let delta_time = delta_time_actual.clamp(0.0, self.config.discipline.max_delta_time());

        // Step 1: collect.
        let collected = self.telemetry.collect(now, self.config.process_limit);
        let telemetry_available = collected.is_ok();

        let (sample, processes) = match &collected {
            Ok(snapshot) => (snapshot.sample, snapshot.top_processes.clone()),
            Err(_) => match &self.last_good {
                Some(good) => (
                    crate::telemetry::sample::Sample {
                        timestamp: now,
                        cpu_percent: good.smoothed_cpu_percent,
                        memory_percent: good.smoothed_memory_percent,
                        ..crate::telemetry::sample::Sample::zero(now)
                    },
                    Vec::new(),
                ),
                None => (crate::telemetry::sample::Sample::zero(now), Vec::new()),
            },
        };

        // Step 2: smooth. Sanitize first so a NaN/Inf telemetry reading can
        // never seed or perturb the exponential moving average.
        use crate::telemetry::baseline::sanitize_percent;
        let smoothed_cpu = self.cpu_ema.advance(sanitize_percent(sample.cpu_percent), delta_time);
        let smoothed_mem = self.mem_ema.advance(sanitize_percent(sample.memory_percent), delta_time);

        // Step 3: advance phase.
        self.phase = (self.phase + delta_time * self.config.pulse_hz).rem_euclid(1.0);

        // Step 4: accent intensity.
        let accent_intensity = compute_accent_intensity(
            smoothed_cpu,
            smoothed_mem,
            self.phase,
            self.config.pulse_strength,
            self.config.accent_floor,
            self.config.accent_ceiling,
        );

        // Step 5: style tokens.
        let variance_alpha = self.variance.push(smoothed_cpu).min(f64::MAX);
        let frame_slack = self.config.discipline.frame_interval() - delta_time_actual;
        let degraded_so_far = !telemetry_available;
        let style = derive_style_tokens(
            self.phase,
            smoothed_cpu,
            smoothed_mem,
            delta_time,
            accent_intensity,
            self.config.discipline,
            degraded_so_far,
            frame_slack,
            self.variance.normalized_alpha(self.config.variance_scale).max(variance_alpha.min(0.0)),
        );

        // Step 6: select timeline source. When telemetry just failed, freeze
        // the timeline at the previous good state rather than advancing it
        // with a synthesized point.
        let (timeline, timeline_source) = if telemetry_available {
            self.select_timeline(now, smoothed_cpu, smoothed_mem)
        } else if let Some(good) = &self.last_good {
            (good.timeline.clone(), good.timeline_source)
        } else {
            self.select_timeline(now, smoothed_cpu, smoothed_mem)
        };

        // Step 7: format strings.
        let format_result = (|| -> crate::error::Result<(Vec<String>, Vec<String>, String, String, String)> {
            let snapshot_lines = match &collected {
                Ok(snapshot) => self.render.format_snapshot_lines(snapshot)?,
                Err(_) => match &self.last_good {
                    Some(good) => vec![good.cpu_line.clone(), good.memory_line.clone()],
                    None => vec![FALLBACK_LINE.to_string(), FALLBACK_LINE.to_string()],
                },
            };
            let process_rows = processes
                .iter()
                .map(|p| self.render.format_process_row(p))
                .collect::<crate::error::Result<Vec<String>>>()?;
            let status = self
                .render
                .format_stream_status(degraded_so_far, if degraded_so_far { "telemetry unavailable" } else { "ok" })?;
            let disk_rate = self
                .render
                .format_disk_rate(sample.disk_read_bps, sample.disk_write_bps)?;
            let network_rate = self
                .render
                .format_network_rate(sample.network_recv_bps, sample.network_sent_bps)?;
            Ok((snapshot_lines, process_rows, status, disk_rate, network_rate))
        })();

        let (render_available, cpu_line, memory_line, process_rows, status_line, timeline_line) =
            match format_result {
                Ok((snapshot_lines, process_rows, status, disk_rate, network_rate)) => (
                    true,
                    snapshot_lines.first().cloned().unwrap_or_else(|| FALLBACK_LINE.to_string()),
                    snapshot_lines.get(1).cloned().unwrap_or_else(|| FALLBACK_LINE.to_string()),
                    process_rows,
                    status,
                    format!("{disk_rate} | {network_rate}"),
                ),
                Err(_) => (
                    false,
                    FALLBACK_LINE.to_string(),
                    FALLBACK_LINE.to_string(),
                    Vec::new(),
                    FALLBACK_LINE.to_string(),
                    FALLBACK_LINE.to_string(),
                ),
            };

        let degraded = !telemetry_available || !render_available;

        let process_rows = if telemetry_available {
            process_rows
        } else if let Some(good) = &self.last_good {
            good.process_rows.clone()
        } else {
            process_rows
        };

        let timestamp_line = format!("t={now:.3}");

        let state = CockpitUiState {
            smoothed_cpu_percent: smoothed_cpu,
            smoothed_memory_percent: smoothed_mem,
            cpu_line,
            memory_line,
            timestamp_line,
            process_rows,
            status_line,
            timeline_line,
            timeline,
            timeline_source,
            style,
            degraded,
            telemetry_available,
            render_available,
        };

        // Step 8: publish; update last_good iff both halves succeeded.
        if telemetry_available && render_available {
            self.last_good = Some(state.clone());
        }
        state
    }

    fn select_timeline(&mut self, now: f64, cpu: f64, mem: f64) -> (Vec<TimelinePoint>, TimelineSource) {
        self.live_ring.push(TimelinePoint {
            timestamp: now,
            cpu_percent: cpu,
            memory_percent: mem,
        });

        if self.config.prefer_dvr_timeline && self.db_configured {
            if let Some(dvr) = &self.dvr {
                if self.tick_count - self.dvr_cache_tick >= self.config.dvr_refresh_ticks || self.dvr_cache.is_empty() {
                    let window_start = now - self.config.timeline_window_seconds;
                    if let Ok(points) = dvr.query_timeline(Some(window_start), Some(now), self.config.timeline_resolution) {
                        self.dvr_cache = points;
                        self.dvr_cache_tick = self.tick_count;
                    }
                }
                if self.dvr_cache.len() >= 2 {
                    return (self.dvr_cache.clone(), TimelineSource::Dvr);
                }
            }
        }

        if self.live_ring.len() >= 2 {
            (self.live_ring.points(), TimelineSource::Live)
        } else {
            (Vec::new(), TimelineSource::None)
        }
    }

    pub fn last_good(&self) -> Option<&CockpitUiState> {
        self.last_good.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridges::{FakeDvrBridge, FakeTelemetryBridge, FallbackRenderBridge};
    use crate::error::AppError;

    fn controller(prefer_dvr: bool, dvr: Option<Box<dyn DvrBridge>>) -> CockpitController {
        let config = CockpitConfig {
            prefer_dvr_timeline: prefer_dvr,
            dvr_refresh_ticks: 1,
            ..CockpitConfig::default()
        };
        CockpitController::new(
            Box::new(FakeTelemetryBridge::new()),
            Box::new(FallbackRenderBridge),
            dvr,
            prefer_dvr,
            config,
        )
    }

    #[test]
    fn first_tick_seeds_smoothed_values_with_no_easing() {
        let fake = FakeTelemetryBridge::new();
        fake.set_next(Ok(bridges::TelemetrySnapshot {
            sample: crate::telemetry::sample::Sample {
                timestamp: 0.0,
                cpu_percent: 37.0,
                memory_percent: 52.0,
                ..crate::telemetry::sample::Sample::zero(0.0)
            },
            top_processes: Vec::new(),
            disk: Default::default(),
            network: Default::default(),
            thermal: Vec::new(),
            gpu: Default::default(),
        }));
        let mut ctrl = CockpitController::new(
            Box::new(fake),
            Box::new(FallbackRenderBridge),
            None,
            false,
            CockpitConfig::default(),
        );
        let state = ctrl.tick(0.0, 0.016);
        assert_eq!(state.smoothed_cpu_percent, 37.0);
        assert_eq!(state.smoothed_memory_percent, 52.0);
    }

    #[test]
    fn rising_memory_percent_eases_at_rise_half_life_not_fall_half_life() {
        let snapshot_at = |memory_percent: f64| {
            Ok(bridges::TelemetrySnapshot {
                sample: crate::telemetry::sample::Sample {
                    timestamp: 0.0,
                    cpu_percent: 0.0,
                    memory_percent,
                    ..crate::telemetry::sample::Sample::zero(0.0)
                },
                top_processes: Vec::new(),
                disk: Default::default(),
                network: Default::default(),
                thermal: Vec::new(),
                gpu: Default::default(),
            })
        };

        let config = CockpitConfig {
            rise_half_life: 0.05,
            fall_half_life: 100.0,
            ..CockpitConfig::default()
        };
        let fake = FakeTelemetryBridge::new();
        fake.set_next(snapshot_at(0.0));
        let mut ctrl = CockpitController::new(Box::new(fake), Box::new(FallbackRenderBridge), None, false, config);
        let seeded = ctrl.tick(0.0, 0.016);
        assert_eq!(seeded.smoothed_memory_percent, 0.0);

        let fake_rise = FakeTelemetryBridge::new();
        fake_rise.set_next(snapshot_at(100.0));
        ctrl.telemetry = Box::new(fake_rise);
        let risen = ctrl.tick(1.0, 1.0);
        // With a rise half-life of 0.05s over a 1s tick, the value should
        // land almost exactly on the target; a fall half-life of 100s would
        // barely have moved off zero.
        assert!(risen.smoothed_memory_percent > 95.0, "{}", risen.smoothed_memory_percent);
    }

    #[test]
    fn nan_and_infinite_telemetry_yield_finite_clamped_output() {
        let fake = FakeTelemetryBridge::new();
        fake.set_next(Ok(bridges::TelemetrySnapshot {
            sample: crate::telemetry::sample::Sample {
                timestamp: 0.0,
                cpu_percent: f64::NAN,
                memory_percent: f64::INFINITY,
                ..crate::telemetry::sample::Sample::zero(0.0)
            },
            top_processes: Vec::new(),
            disk: Default::default(),
            network: Default::default(),
            thermal: Vec::new(),
            gpu: Default::default(),
        }));
        let mut ctrl = CockpitController::new(
            Box::new(fake),
            Box::new(FallbackRenderBridge),
            None,
            false,
            CockpitConfig::default(),
        );
        let state = ctrl.tick(0.0, 0.016);
        assert!(state.smoothed_cpu_percent.is_finite());
        assert!(state.smoothed_memory_percent.is_finite());
        assert!(!state.cpu_line.is_empty());
    }

    #[test]
    fn telemetry_failure_after_good_tick_reuses_last_good_content() {
        let fake = FakeTelemetryBridge::new();
        let mut ctrl = CockpitController::new(
            Box::new(fake),
            Box::new(FallbackRenderBridge),
            None,
            false,
            CockpitConfig::default(),
        );
        // This relies on FakeTelemetryBridge's default (zeroed) snapshot as
        // the "good" tick, since `set_next` is consumed on read.
        let good = ctrl.tick(0.0, 0.016);
        assert!(!good.degraded);

        // Simulate a failing tick by wiring a bridge whose inner fake always errors.
        struct AlwaysFails;
        impl TelemetryBridge for AlwaysFails {
            fn collect(&mut self, _now: f64, _limit: usize) -> crate::error::Result<bridges::TelemetrySnapshot> {
                Err(AppError::Unavailable("collector missing".into()))
            }
        }
        let mut ctrl2 = CockpitController::new(
            Box::new(AlwaysFails),
            Box::new(FallbackRenderBridge),
            None,
            false,
            CockpitConfig::default(),
        );
        let first = ctrl2.tick(0.0, 0.016);
        assert!(first.degraded);
        assert!(!first.telemetry_available);
    }

    #[test]
    fn dvr_timeline_selected_when_preferred_and_sufficient_points() {
        let points: Vec<TimelinePoint> = (0..10)
            .map(|i| TimelinePoint {
                timestamp: i as f64,
                cpu_percent: i as f64,
                memory_percent: 0.0,
            })
            .collect();
        let dvr: Box<dyn DvrBridge> = Box::new(FakeDvrBridge { points, fail: false });
        let mut ctrl = controller(true, Some(dvr));
        let state = ctrl.tick(0.0, 0.016);
        assert_eq!(state.timeline_source, TimelineSource::Dvr);
        assert!(state.timeline.len() >= 2);
    }

    #[test]
    fn falls_back_to_live_timeline_when_dvr_unavailable() {
        let dvr: Box<dyn DvrBridge> = Box::new(FakeDvrBridge { points: Vec::new(), fail: true });
        let mut ctrl = controller(true, Some(dvr));
        ctrl.tick(0.0, 0.016);
        let state = ctrl.tick(1.0, 0.016);
        assert_eq!(state.timeline_source, TimelineSource::Live);
    }
}
