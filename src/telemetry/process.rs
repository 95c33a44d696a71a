//! Top-k process ranking and the PID-reuse-safe CPU-state cache.

use super::baseline::ProcessCpuState;
use super::sample::ProcessSample;
use std::collections::HashMap;

/// `(pid -> ProcessCpuState)`, pruned after every enumeration so that
/// processes that have exited don't accumulate forever.
#[derive(Debug, Default)]
pub struct ProcessStateCache {
    states: HashMap<u32, ProcessCpuState>,
}

impl ProcessStateCache {
    pub fn new() -> Self {
        ProcessStateCache {
            states: HashMap::new(),
        }
    }

    /// Looks up the cached state for `pid`, discarding it first if the
    /// process's creation time no longer matches (PID reuse).
    pub fn advance_cpu(
        &mut self,
        pid: u32,
        create_time_100ns: u64,
        total_100ns: u64,
        sampled_100ns: u64,
        logical_cpu_count: u64,
    ) -> f64 {
        let state = self
            .states
            .entry(pid)
            .or_insert_with(|| ProcessCpuState::seed(create_time_100ns, total_100ns, sampled_100ns));
        state.advance(create_time_100ns, total_100ns, sampled_100ns, logical_cpu_count)
    }

    /// Evicts every cached pid not present in `observed_pids` this tick.
    pub fn prune(&mut self, observed_pids: &[u32]) {
        let observed: std::collections::HashSet<u32> = observed_pids.iter().copied().collect();
        self.states.retain(|pid, _| observed.contains(pid));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.states.len()
    }
}

/// Ranks `samples` by `(cpu% desc, rss desc, pid asc)` and truncates to
/// `limit`. Ordering is stable: equal keys keep their input order.
pub fn top_k(mut samples: Vec<ProcessSample>, limit: usize) -> Vec<ProcessSample> {
    samples.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.memory_rss_bytes.cmp(&a.memory_rss_bytes))
            .then_with(|| a.pid.cmp(&b.pid))
    });
    samples.truncate(limit);
    samples
}
