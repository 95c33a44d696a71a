//! Raw monotonic counters read straight from `/proc`: exact kernel/user/idle
//! jiffy totals instead of a pre-smoothed percentage from a cross-platform
//! crate.
//!
//! Conversion constant: Linux reports `/proc/stat` and `/proc/[pid]/stat`
//! in clock ticks, almost universally 100 Hz (`sysconf(_SC_CLK_TCK)`). One
//! tick is therefore treated as `100_000` of the 100ns units the process CPU
//! state tracks (10ms / 100ns = 100_000).

use std::fs;
use std::path::Path;

const TICKS_TO_100NS: u64 = 100_000;

const DEFAULT_PROC_ROOT: &str = "/proc";

/// `(kernel_ticks, user_ticks, idle_ticks)` summed from the aggregate `cpu `
/// line of `/proc/stat`. `kernel` is `system + nice + irq + softirq + steal`;
/// `idle` is `idle + iowait`.
pub fn read_system_cpu_counters() -> Option<(u64, u64, u64)> {
    read_cpu_line(Path::new(DEFAULT_PROC_ROOT), "cpu ")
}

/// Per-core counters keyed by core index, parsed from the `cpuN` lines.
pub fn read_per_core_cpu_counters() -> Vec<(usize, u64, u64, u64)> {
    read_per_core(Path::new(DEFAULT_PROC_ROOT))
}

/// `(total_100ns, create_time_100ns)` for one process, read from
/// `/proc/<pid>/stat`. `total` is `utime + stime` (fields 14, 15); the
/// create time is `starttime` (field 22), both converted to 100ns units.
pub fn read_process_cpu_counters(pid: u32) -> Option<(u64, u64)> {
    read_process_stat(Path::new(DEFAULT_PROC_ROOT), pid)
}

/// Summed `(read_bytes, write_bytes)` across whole-disk devices in
/// `/proc/diskstats`; partitions and virtual devices (loop, ram, dm-) are
/// excluded to avoid double-counting.
pub fn read_diskstats_totals() -> (u64, u64) {
    read_diskstats(Path::new(DEFAULT_PROC_ROOT))
}

fn read_cpu_line(proc_root: &Path, prefix: &str) -> Option<(u64, u64, u64)> {
    let content = fs::read_to_string(proc_root.join("stat")).ok()?;
    let line = content.lines().find(|l| l.starts_with(prefix))?;
    parse_cpu_fields(line)
}

fn read_per_core(proc_root: &Path) -> Vec<(usize, u64, u64, u64)> {
    let Ok(content) = fs::read_to_string(proc_root.join("stat")) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| l.starts_with("cpu") && !l.starts_with("cpu "))
        .filter_map(|l| {
            let (label, _) = l.split_once(' ')?;
            let index: usize = label.strip_prefix("cpu")?.parse().ok()?;
            let (kernel, user, idle) = parse_cpu_fields(l)?;
            Some((index, kernel, user, idle))
        })
        .collect()
}

fn parse_cpu_fields(line: &str) -> Option<(u64, u64, u64)> {
    let mut fields = line.split_whitespace();
    fields.next()?; // "cpu" / "cpuN" label
    let user: u64 = fields.next()?.parse().ok()?;
    let nice: u64 = fields.next()?.parse().ok()?;
    let system: u64 = fields.next()?.parse().ok()?;
    let idle: u64 = fields.next()?.parse().ok()?;
    let iowait: u64 = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let irq: u64 = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let softirq: u64 = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let steal: u64 = fields.next().and_then(|v| v.parse().ok()).unwrap_or(0);

    let kernel = system + irq + softirq + steal;
    Some((kernel, user + nice, idle + iowait))
}

fn read_process_stat(proc_root: &Path, pid: u32) -> Option<(u64, u64)> {
    let content = fs::read_to_string(proc_root.join(pid.to_string()).join("stat")).ok()?;
    // The comm field is parenthesized and may itself contain spaces or
    // parens, so split on the *last* ')' before resuming whitespace parsing.
    let after_comm = content.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // Fields here are numbered from state=1 (index 0 in `fields`).
    // utime=14, stime=15, starttime=22 in the full /proc/pid/stat numbering,
    // i.e. indices 11, 12, 19 within `fields`.
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    let starttime: u64 = fields.get(19)?.parse().ok()?;

    let total_ticks = utime + stime;
    Some((total_ticks * TICKS_TO_100NS, starttime * TICKS_TO_100NS))
}

fn read_diskstats(proc_root: &Path) -> (u64, u64) {
    let Ok(content) = fs::read_to_string(proc_root.join("diskstats")) else {
        return (0, 0);
    };

    let mut read_bytes = 0u64;
    let mut write_bytes = 0u64;
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(name) = fields.get(2) else { continue };
        if !is_whole_disk(name) {
            continue;
        }
        let sectors_read: u64 = fields.get(5).and_then(|v| v.parse().ok()).unwrap_or(0);
        let sectors_written: u64 = fields.get(9).and_then(|v| v.parse().ok()).unwrap_or(0);
        read_bytes += sectors_read * 512;
        write_bytes += sectors_written * 512;
    }
    (read_bytes, write_bytes)
}

fn is_whole_disk(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("sr") || name.starts_with("dm-") {
        return false;
    }
    if name.starts_with("nvme") {
        // Partitions look like nvme0n1p1; whole disks are nvme0n1.
        return !(name.contains('p') && name.rsplit('p').next().unwrap_or("").chars().all(|c| c.is_ascii_digit()) && !name.rsplit('p').next().unwrap_or("").is_empty());
    }
    if name.starts_with("mmcblk") {
        return !name.contains('p');
    }
    !name.chars().last().map_or(false, |c| c.is_ascii_digit())
}
