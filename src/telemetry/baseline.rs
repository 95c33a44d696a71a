//! Sanitation helpers and monotonic-counter baseline bookkeeping.
//!
//! Tracks the simple "previous raw counter, previous timestamp" shape this
//! engine's rate math needs, with wrap/reset always yielding a zero rate
//! rather than a negative or huge spurious one.

/// `clamp(x, 0, 100)` with NaN/Inf coerced to 0.
pub fn sanitize_percent(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    x.clamp(0.0, 100.0)
}

/// `max(0, x)` with NaN/Inf coerced to 0.
pub fn sanitize_non_negative(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    x.max(0.0)
}

/// One resource family's (timestamp, raw counter) baseline. Rates are only
/// emitted once a previous baseline exists, `delta_time > 0`, and the raw
/// counter did not go backwards; wrap/reset replaces the baseline but yields
/// a zero rate for that tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterBaseline {
    has_previous: bool,
    last_timestamp: f64,
    last_raw: u64,
}

impl CounterBaseline {
    pub fn new() -> Self {
        CounterBaseline::default()
    }

    /// Advances the baseline to `(timestamp, raw)` and returns the rate in
    /// units/second computed against the previous baseline, or `0.0` if no
    /// previous baseline existed or the counter went backwards.
    pub fn advance(&mut self, timestamp: f64, raw: u64) -> f64 {
        let rate = if self.has_previous {
            let delta_time = timestamp - self.last_timestamp;
            if delta_time > 0.0 && raw >= self.last_raw {
                (raw - self.last_raw) as f64 / delta_time
            } else {
                0.0
            }
        } else {
            0.0
        };
        self.last_timestamp = timestamp;
        self.last_raw = raw;
        self.has_previous = true;
        sanitize_non_negative(rate)
    }
}

/// Baseline for the `usage% = 100·(Δkernel+Δuser−Δidle)/(Δkernel+Δuser)`
/// formula, shared by the system-wide and per-core CPU collectors. First
/// call seeds the baseline and yields `0.0`; a non-monotonic delta (counter
/// wrap or reset) also yields `0.0` but still replaces the baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelUserIdleBaseline {
    has_previous: bool,
    last_kernel: u64,
    last_user: u64,
    last_idle: u64,
}

impl KernelUserIdleBaseline {
    pub fn new() -> Self {
        KernelUserIdleBaseline::default()
    }

    pub fn advance(&mut self, kernel: u64, user: u64, idle: u64) -> f64 {
        let usage = if self.has_previous
            && kernel >= self.last_kernel
            && user >= self.last_user
            && idle >= self.last_idle
        {
            let delta_kernel = (kernel - self.last_kernel) as f64;
            let delta_user = (user - self.last_user) as f64;
            let delta_idle = (idle - self.last_idle) as f64;
            let busy = delta_kernel + delta_user;
            if busy > 0.0 {
                100.0 * (busy - delta_idle) / busy
            } else {
                0.0
            }
        } else {
            0.0
        };
        self.last_kernel = kernel;
        self.last_user = user;
        self.last_idle = idle;
        self.has_previous = true;
        sanitize_percent(usage)
    }
}

/// Per-pid CPU accounting. `last_total_100ns`/`last_sampled_100ns` mirror the
/// Windows-style "100ns units" the original telemetry source used;
/// `last_create_time_100ns` is the PID-reuse guard.
#[derive(Debug, Clone, Copy)]
pub struct ProcessCpuState {
    pub last_total_100ns: u64,
    pub last_sampled_100ns: u64,
    pub last_create_time_100ns: u64,
}

impl ProcessCpuState {
    pub fn seed(create_time_100ns: u64, total_100ns: u64, sampled_100ns: u64) -> Self {
        ProcessCpuState {
            last_total_100ns: total_100ns,
            last_sampled_100ns: sampled_100ns,
            last_create_time_100ns: create_time_100ns,
        }
    }

    /// Returns `cpu% = (Δprocess_total · 100) / (Δwall · logical_cpu_count)`,
    /// or `0.0` on the first observation of this creation time, a
    /// non-monotonic total, or a non-positive wall delta.
    pub fn advance(
        &mut self,
        create_time_100ns: u64,
        total_100ns: u64,
        sampled_100ns: u64,
        logical_cpu_count: u64,
    ) -> f64 {
        let reused = create_time_100ns != self.last_create_time_100ns;
        let cpu = if reused {
            0.0
        } else {
            let delta_total = total_100ns.checked_sub(self.last_total_100ns);
            let delta_wall = sampled_100ns.saturating_sub(self.last_sampled_100ns);
            match delta_total {
                Some(dt) if delta_wall > 0 && logical_cpu_count > 0 => {
                    (dt as f64 * 100.0) / (delta_wall as f64 * logical_cpu_count as f64)
                }
                _ => 0.0,
            }
        };
        self.last_total_100ns = total_100ns;
        self.last_sampled_100ns = sampled_100ns;
        self.last_create_time_100ns = create_time_100ns;
        sanitize_percent(cpu)
    }
}
