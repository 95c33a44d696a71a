//! Live ring buffer and timeline-source bookkeeping for the cockpit.

use crate::telemetry::sample::Sample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineSource {
    None,
    Live,
    Dvr,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl From<&Sample> for TimelinePoint {
    fn from(s: &Sample) -> Self {
        TimelinePoint {
            timestamp: s.timestamp,
            cpu_percent: s.cpu_percent,
            memory_percent: s.memory_percent,
        }
    }
}

/// A bounded, time-windowed ring of live `(timestamp, cpu, mem)` points used
/// when the DVR timeline is unavailable or not preferred.
pub struct LiveTimelineRing {
    capacity: usize,
    window_seconds: f64,
    points: VecDeque<TimelinePoint>,
}

impl LiveTimelineRing {
    pub fn new(capacity: usize, window_seconds: f64) -> Self {
        LiveTimelineRing {
            capacity,
            window_seconds,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: TimelinePoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
        let horizon = point.timestamp - self.window_seconds;
        while self
            .points
            .front()
            .map(|p| p.timestamp < horizon)
            .unwrap_or(false)
        {
            self.points.pop_front();
        }
    }

    pub fn points(&self) -> Vec<TimelinePoint> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: f64) -> TimelinePoint {
        TimelinePoint {
            timestamp: t,
            cpu_percent: 0.0,
            memory_percent: 0.0,
        }
    }

    #[test]
    fn ring_bounds_by_capacity() {
        let mut ring = LiveTimelineRing::new(3, 1_000.0);
        for i in 0..10 {
            ring.push(point(i as f64));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.points().first().unwrap().timestamp, 7.0);
    }

    #[test]
    fn ring_evicts_points_outside_the_time_window() {
        let mut ring = LiveTimelineRing::new(100, 5.0);
        ring.push(point(0.0));
        ring.push(point(1.0));
        ring.push(point(10.0)); // evicts points older than 10.0 - 5.0 = 5.0
        let timestamps: Vec<f64> = ring.points().iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![10.0]);
    }
}
