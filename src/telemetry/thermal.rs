//! Best-effort thermal sensor collection via Linux sysfs.
//!
//! Falls back through coretemp → k10temp → generic hwmon, returning a list
//! of labeled sensors plus an optional hottest-sensor accessor. The sysfs
//! root is parameterized so tests can point it at a fixture tree.

use super::sample::ThermalSensor;
use std::fs;
use std::path::Path;

const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Never fails: a missing or unreadable sensor tree yields an empty list.
pub fn collect_thermal() -> Vec<ThermalSensor> {
    read_thermal_data(Path::new(DEFAULT_SYSFS_ROOT))
}

pub fn hottest(sensors: &[ThermalSensor]) -> Option<&ThermalSensor> {
    sensors
        .iter()
        .max_by(|a, b| a.celsius.partial_cmp(&b.celsius).unwrap_or(std::cmp::Ordering::Equal))
}

fn read_thermal_data(sysfs_root: &Path) -> Vec<ThermalSensor> {
    let coretemp = read_coretemp(sysfs_root);
    if !coretemp.is_empty() {
        return coretemp;
    }
    let k10temp = read_k10temp(sysfs_root);
    if !k10temp.is_empty() {
        return k10temp;
    }
    read_generic_hwmon(sysfs_root)
}

fn read_coretemp(sysfs_root: &Path) -> Vec<ThermalSensor> {
    let platform_dir = sysfs_root.join("devices/platform");
    let Ok(entries) = fs::read_dir(&platform_dir) else {
        return Vec::new();
    };

    let mut sensors = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("coretemp.") {
            continue;
        }
        let hwmon_dir = entry.path().join("hwmon");
        let Ok(hwmon_entries) = fs::read_dir(&hwmon_dir) else {
            continue;
        };
        for hwmon_entry in hwmon_entries.flatten() {
            sensors.extend(read_temp_inputs(&hwmon_entry.path()));
        }
    }
    sensors
}

fn read_k10temp(sysfs_root: &Path) -> Vec<ThermalSensor> {
    let hwmon_class_dir = sysfs_root.join("class/hwmon");
    let Ok(entries) = fs::read_dir(&hwmon_class_dir) else {
        return Vec::new();
    };

    let mut sensors = Vec::new();
    for entry in entries.flatten() {
        let name_path = entry.path().join("name");
        if let Ok(name) = fs::read_to_string(&name_path) {
            if name.trim() == "k10temp" {
                sensors.extend(read_temp_inputs(&entry.path()));
            }
        }
    }
    sensors
}

fn read_generic_hwmon(sysfs_root: &Path) -> Vec<ThermalSensor> {
    let hwmon_class_dir = sysfs_root.join("class/hwmon");
    let Ok(entries) = fs::read_dir(&hwmon_class_dir) else {
        return Vec::new();
    };

    let mut sensors = Vec::new();
    for entry in entries.flatten() {
        sensors.extend(read_temp_inputs(&entry.path()));
    }
    sensors
}

/// Reads every `temp*_input` file in `hwmon_dir`, pairing it with the
/// sibling `temp*_label` when present, falling back to the input's own
/// numeric suffix as the label.
fn read_temp_inputs(hwmon_dir: &Path) -> Vec<ThermalSensor> {
    let Ok(entries) = fs::read_dir(hwmon_dir) else {
        return Vec::new();
    };

    let mut sensors = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !file_name.starts_with("temp") || !file_name.ends_with("_input") {
            continue;
        }
        let Ok(raw) = fs::read_to_string(entry.path()) else {
            continue;
        };
        let Ok(millidegrees) = raw.trim().parse::<i64>() else {
            continue;
        };
        let celsius = millidegrees as f32 / 1000.0;

        let label_name = file_name.replace("_input", "_label");
        let label_path = hwmon_dir.join(label_name);
        let label = fs::read_to_string(&label_path)
            .ok()
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| file_name.replace("_input", "").to_string());

        sensors.push(ThermalSensor { label, celsius });
    }
    sensors
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sensor(dir: &Path, n: u32, millidegrees: i64, label: Option<&str>) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(format!("temp{n}_input")), millidegrees.to_string()).unwrap();
        if let Some(label) = label {
            fs::write(dir.join(format!("temp{n}_label")), label).unwrap();
        }
    }

    #[test]
    fn reads_coretemp_sensors_with_labels() {
        let root = TempDir::new().unwrap();
        let hwmon = root
            .path()
            .join("devices/platform/coretemp.0/hwmon/hwmon2");
        write_sensor(&hwmon, 1, 45500, Some("Package id 0"));
        write_sensor(&hwmon, 2, 41000, Some("Core 0"));

        let sensors = read_thermal_data(root.path());
        assert_eq!(sensors.len(), 2);
        assert!(sensors.iter().any(|s| s.label == "Package id 0" && s.celsius == 45.5));
    }

    #[test]
    fn falls_back_to_k10temp_when_no_coretemp() {
        let root = TempDir::new().unwrap();
        let hwmon = root.path().join("class/hwmon/hwmon0");
        fs::create_dir_all(&hwmon).unwrap();
        fs::write(hwmon.join("name"), "k10temp").unwrap();
        write_sensor(&hwmon, 1, 38000, None);

        let sensors = read_thermal_data(root.path());
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].celsius, 38.0);
    }

    #[test]
    fn missing_sysfs_tree_yields_empty_list_never_fails() {
        let root = TempDir::new().unwrap();
        let sensors = read_thermal_data(&root.path().join("nonexistent"));
        assert!(sensors.is_empty());
    }

    #[test]
    fn hottest_picks_max_celsius() {
        let sensors = vec![
            ThermalSensor { label: "a".into(), celsius: 40.0 },
            ThermalSensor { label: "b".into(), celsius: 55.0 },
        ];
        assert_eq!(hottest(&sensors).unwrap().label, "b");
    }
}
