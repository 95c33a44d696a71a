//! Cockpit controller resilience scenarios exercised through the public
//! API, independent of the unit tests colocated with the controller.

use aura::cockpit::bridges::{FakeDvrBridge, FakeTelemetryBridge, FallbackRenderBridge, TelemetrySnapshot};
use aura::cockpit::timeline::TimelinePoint;
use aura::cockpit::{CockpitConfig, CockpitController};
use aura::telemetry::sample::Sample;

#[test]
fn nan_and_infinite_readings_never_escape_to_the_published_state() {
    let fake = FakeTelemetryBridge::new();
    fake.set_next(Ok(TelemetrySnapshot {
        sample: Sample {
            cpu_percent: f64::NAN,
            memory_percent: f64::INFINITY,
            ..Sample::zero(0.0)
        },
        top_processes: Vec::new(),
        disk: Default::default(),
        network: Default::default(),
        thermal: Vec::new(),
        gpu: Default::default(),
    }));

    let mut controller = CockpitController::new(
        Box::new(fake),
        Box::new(FallbackRenderBridge),
        None,
        false,
        CockpitConfig::default(),
    );

    let state = controller.tick(0.0, 0.016);
    assert!(state.smoothed_cpu_percent.is_finite());
    assert!((0.0..=100.0).contains(&state.smoothed_cpu_percent));
    assert!(state.smoothed_memory_percent.is_finite());
    assert!((0.0..=100.0).contains(&state.smoothed_memory_percent));
    assert!(!state.cpu_line.is_empty());
}

#[test]
fn dvr_preferred_timeline_survives_lttb_downsampling() {
    let points: Vec<TimelinePoint> = (0..10)
        .map(|i| TimelinePoint { timestamp: i as f64, cpu_percent: i as f64 * 2.0, memory_percent: 0.0 })
        .collect();
    let dvr = FakeDvrBridge { points, fail: false };

    let config = CockpitConfig { prefer_dvr_timeline: true, dvr_refresh_ticks: 1, ..CockpitConfig::default() };
    let mut controller = CockpitController::new(
        Box::new(FakeTelemetryBridge::new()),
        Box::new(FallbackRenderBridge),
        Some(Box::new(dvr)),
        true,
        config,
    );

    let state = controller.tick(0.0, 0.016);
    assert_eq!(state.timeline_source, aura::cockpit::timeline::TimelineSource::Dvr);
    assert!(state.timeline.len() >= 8);
}

#[test]
fn unavailable_dvr_falls_back_to_live_timeline_after_two_ticks() {
    let dvr = FakeDvrBridge { points: Vec::new(), fail: true };
    let config = CockpitConfig { prefer_dvr_timeline: true, dvr_refresh_ticks: 1, ..CockpitConfig::default() };
    let mut controller = CockpitController::new(
        Box::new(FakeTelemetryBridge::new()),
        Box::new(FallbackRenderBridge),
        Some(Box::new(dvr)),
        true,
        config,
    );

    controller.tick(0.0, 0.016);
    let state = controller.tick(1.0, 0.016);
    assert_eq!(state.timeline_source, aura::cockpit::timeline::TimelineSource::Live);
}
