//! Best-effort GPU collection.
//!
//! Does one best-effort sysfs read for the `amdgpu` driver (the only in-tree
//! Linux driver that exposes busy% and VRAM usage directly as plain sysfs
//! files) and otherwise reports unavailable — it never fails, and never
//! synthesizes a reading.

use super::sample::GpuSample;
use std::fs;
use std::path::Path;

const DEFAULT_DRM_ROOT: &str = "/sys/class/drm";

pub fn collect_gpu() -> GpuSample {
    read_amdgpu(Path::new(DEFAULT_DRM_ROOT)).unwrap_or_default()
}

fn read_amdgpu(drm_root: &Path) -> Option<GpuSample> {
    let entries = fs::read_dir(drm_root).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("card") || name.contains('-') {
            continue;
        }
        let device_dir = entry.path().join("device");
        let busy_path = device_dir.join("gpu_busy_percent");
        let Ok(busy_raw) = fs::read_to_string(&busy_path) else {
            continue;
        };
        let Ok(gpu_percent) = busy_raw.trim().parse::<f64>() else {
            continue;
        };

        let vram_used = read_u64(&device_dir.join("mem_info_vram_used")).unwrap_or(0);
        let vram_total = read_u64(&device_dir.join("mem_info_vram_total")).unwrap_or(0);
        let vram_percent = if vram_total > 0 {
            (vram_used as f64 / vram_total as f64) * 100.0
        } else {
            0.0
        };

        return Some(GpuSample {
            available: true,
            gpu_percent: gpu_percent.clamp(0.0, 100.0),
            vram_percent: vram_percent.clamp(0.0, 100.0),
            vram_used_bytes: vram_used,
            vram_total_bytes: vram_total,
        });
    }
    None
}

fn read_u64(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
