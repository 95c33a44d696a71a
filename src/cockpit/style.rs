//! Style token derivation: a pure function of the smoothed signals, phase,
//! and frame discipline — no I/O, no mutable state, safe to unit test in
//! isolation from the controller's tick loop.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameDiscipline {
    pub target_fps: f64,
    pub max_catchup_frames: u32,
}

impl FrameDiscipline {
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.target_fps
    }

    pub fn max_delta_time(&self) -> f64 {
        self.frame_interval() * self.max_catchup_frames as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleTokens {
    pub phase: f64,
    pub next_delay_seconds: f64,
    pub accent_intensity: f64,
    pub accent_r: f64,
    pub accent_g: f64,
    pub accent_b: f64,
    pub accent_a: f64,
    pub frost_intensity: f64,
    pub tint_strength: f64,
    pub ring_line_width: f64,
    pub ring_glow_strength: f64,
    pub cpu_alpha: f64,
    pub memory_alpha: f64,
    pub severity_level: u8,
    pub motion_scale: f64,
    pub quality_hint: u8,
    pub timeline_anomaly_alpha: f64,
}

/// `max(cpu, mem)/100` blended with a sinusoidal pulse of amplitude
/// `pulse_strength`, clamped to `[floor, ceiling]`.
pub fn compute_accent_intensity(
    smoothed_cpu: f64,
    smoothed_mem: f64,
    phase: f64,
    pulse_strength: f64,
    floor: f64,
    ceiling: f64,
) -> f64 {
    let load = smoothed_cpu.max(smoothed_mem) / 100.0;
    let pulse = (phase * 2.0 * PI).sin() * pulse_strength;
    (load + pulse).clamp(floor, ceiling)
}

#[allow(clippy::too_many_arguments)]
pub fn derive_style_tokens(
    phase: f64,
    smoothed_cpu: f64,
    smoothed_mem: f64,
    delta_time: f64,
    accent_intensity: f64,
    discipline: FrameDiscipline,
    degraded: bool,
    frame_slack: f64,
    timeline_anomaly_alpha: f64,
) -> StyleTokens {
    let load = smoothed_cpu.max(smoothed_mem) / 100.0;
    let severity_level = severity_from_load(load);
    let (r, g, b) = accent_color(severity_level);

    StyleTokens {
        phase,
        next_delay_seconds: (discipline.frame_interval() - delta_time).max(0.0),
        accent_intensity,
        accent_r: r,
        accent_g: g,
        accent_b: b,
        accent_a: accent_intensity.clamp(0.0, 1.0),
        frost_intensity: (1.0 - accent_intensity * 0.5).clamp(0.0, 1.0),
        tint_strength: (accent_intensity * 0.6).clamp(0.0, 1.0),
        ring_line_width: (1.0 + accent_intensity * 6.0).clamp(0.01, 7.0),
        ring_glow_strength: accent_intensity.clamp(0.0, 1.0),
        cpu_alpha: (smoothed_cpu / 100.0).clamp(0.0, 1.0),
        memory_alpha: (smoothed_mem / 100.0).clamp(0.0, 1.0),
        severity_level,
        motion_scale: if degraded { 0.2 } else { 1.0 },
        quality_hint: quality_hint_from_slack(frame_slack, discipline.frame_interval()),
        timeline_anomaly_alpha: timeline_anomaly_alpha.clamp(0.0, 1.0),
    }
}

fn severity_from_load(load: f64) -> u8 {
    if load < 0.5 {
        0
    } else if load < 0.75 {
        1
    } else if load < 0.9 {
        2
    } else {
        3
    }
}

fn accent_color(severity_level: u8) -> (f64, f64, f64) {
    match severity_level {
        0 => (0.2, 0.6, 1.0),  // cool blue
        1 => (0.3, 0.8, 0.4),  // green
        2 => (0.95, 0.75, 0.2), // amber
        _ => (0.95, 0.25, 0.25), // red
    }
}

fn quality_hint_from_slack(frame_slack: f64, frame_interval: f64) -> u8 {
    if frame_slack < 0.0 {
        0
    } else if frame_slack < frame_interval * 0.5 {
        1
    } else {
        2
    }
}

/// Rolling variance of a bounded window of CPU% samples, used as the
/// `timeline_anomaly_alpha` input — higher variance brightens the anomaly
/// highlight on the timeline.
pub struct RollingVariance {
    window: std::collections::VecDeque<f64>,
    capacity: usize,
}

impl RollingVariance {
    pub fn new(capacity: usize) -> Self {
        RollingVariance {
            window: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) -> f64 {
        self.window.push_back(value);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        self.variance()
    }

    fn variance(&self) -> f64 {
        if self.window.len() < 2 {
            return 0.0;
        }
        let n = self.window.len() as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let sum_sq = self.window.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        sum_sq / n
    }

    /// Normalizes the variance into `[0,1]` against a fixed scale so it can
    /// be used directly as an alpha.
    pub fn normalized_alpha(&self, scale: f64) -> f64 {
        if scale <= 0.0 {
            return 0.0;
        }
        (self.variance() / scale).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accent_intensity_is_clamped_to_bounds() {
        let intensity = compute_accent_intensity(100.0, 100.0, 0.25, 0.5, 0.15, 0.95);
        assert!((0.15..=0.95).contains(&intensity));

        let low = compute_accent_intensity(0.0, 0.0, 0.0, 0.0, 0.15, 0.95);
        assert_eq!(low, 0.15);
    }

    #[test]
    fn severity_bands_match_load_thresholds() {
        assert_eq!(severity_from_load(0.1), 0);
        assert_eq!(severity_from_load(0.6), 1);
        assert_eq!(severity_from_load(0.8), 2);
        assert_eq!(severity_from_load(0.95), 3);
    }

    #[test]
    fn ring_line_width_stays_in_open_closed_range() {
        let discipline = FrameDiscipline { target_fps: 60.0, max_catchup_frames: 4 };
        let tokens = derive_style_tokens(0.1, 50.0, 50.0, 0.016, 0.5, discipline, false, 0.01, 0.0);
        assert!(tokens.ring_line_width > 0.0 && tokens.ring_line_width <= 7.0);
    }

    #[test]
    fn degraded_reduces_motion_scale() {
        let discipline = FrameDiscipline { target_fps: 60.0, max_catchup_frames: 4 };
        let tokens = derive_style_tokens(0.1, 10.0, 10.0, 0.016, 0.2, discipline, true, 0.01, 0.0);
        assert!(tokens.motion_scale < 1.0);
    }

    #[test]
    fn rolling_variance_is_zero_for_constant_signal() {
        let mut variance = RollingVariance::new(8);
        for _ in 0..8 {
            variance.push(50.0);
        }
        assert_eq!(variance.normalized_alpha(10.0), 0.0);
    }

    #[test]
    fn rolling_variance_rises_with_oscillating_signal() {
        let mut variance = RollingVariance::new(8);
        for i in 0..8 {
            variance.push(if i % 2 == 0 { 0.0 } else { 100.0 });
        }
        assert!(variance.normalized_alpha(1000.0) > 0.0);
    }
}
