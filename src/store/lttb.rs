//! Largest-Triangle-Three-Buckets downsampling over `(timestamp, cpu%)`.

use crate::telemetry::sample::Sample;

/// Downsamples `points` to `target` points using LTTB. Always preserves the
/// first and last input points. `target` must be `>= 3`; when
/// `points.len() <= target`, the input is returned unchanged.
pub fn downsample_lttb(points: &[Sample], target: usize) -> Vec<Sample> {
    assert!(target >= 3, "LTTB target must be >= 3");
    if points.len() <= target || points.len() < 3 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(target);
    out.push(points[0]);

    // Buckets exclude the fixed first/last points.
    let bucket_count = target - 2;
    let bucket_size = (points.len() - 2) as f64 / bucket_count as f64;

    let mut a = 0usize; // index of the previously selected point
    for i in 0..bucket_count {
        let bucket_start = 1 + (i as f64 * bucket_size).floor() as usize;
        let bucket_end = (1 + ((i + 1) as f64 * bucket_size).floor() as usize).min(points.len() - 1);
        let bucket_end = bucket_end.max(bucket_start + 1);

        // Average point of the *next* bucket, used as the triangle's third vertex.
        let next_start = bucket_end;
        let next_end = if i + 2 == bucket_count {
            points.len() - 1
        } else {
            (1 + ((i + 2) as f64 * bucket_size).floor() as usize).min(points.len() - 1)
        };
        let next_end = next_end.max(next_start + 1).min(points.len());
        let (avg_x, avg_y) = average_point(&points[next_start.min(points.len() - 1)..next_end]);

        let point_a = points[a];
        let mut best_index = bucket_start;
        let mut best_area = -1.0;
        for idx in bucket_start..bucket_end {
            let candidate = points[idx];
            let area = triangle_area(
                (point_a.timestamp, point_a.cpu_percent),
                (candidate.timestamp, candidate.cpu_percent),
                (avg_x, avg_y),
            );
            if area > best_area {
                best_area = area;
                best_index = idx;
            }
        }

        out.push(points[best_index]);
        a = best_index;
    }

    out.push(*points.last().unwrap());
    out
}

fn average_point(slice: &[Sample]) -> (f64, f64) {
    if slice.is_empty() {
        return (0.0, 0.0);
    }
    let n = slice.len() as f64;
    let sum_x: f64 = slice.iter().map(|s| s.timestamp).sum();
    let sum_y: f64 = slice.iter().map(|s| s.cpu_percent).sum();
    (sum_x / n, sum_y / n)
}

fn triangle_area(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)) -> f64 {
    ((p1.0 - p3.0) * (p2.1 - p3.1) - (p1.1 - p3.1) * (p2.0 - p3.0)).abs() * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, cpu: f64) -> Sample {
        Sample {
            timestamp: t,
            cpu_percent: cpu,
            ..Sample::zero(t)
        }
    }

    #[test]
    fn output_length_is_min_of_target_and_input() {
        let points: Vec<Sample> = (0..100).map(|i| sample(i as f64, (i % 50) as f64)).collect();
        let out = downsample_lttb(&points, 20);
        assert_eq!(out.len(), 20);

        let small: Vec<Sample> = (0..5).map(|i| sample(i as f64, i as f64)).collect();
        let out_small = downsample_lttb(&small, 20);
        assert_eq!(out_small.len(), 5);
    }

    #[test]
    fn first_and_last_points_are_preserved() {
        let points: Vec<Sample> = (0..50).map(|i| sample(i as f64, (i * 3 % 17) as f64)).collect();
        let out = downsample_lttb(&points, 10);
        assert_eq!(out.first().unwrap().timestamp, points.first().unwrap().timestamp);
        assert_eq!(out.last().unwrap().timestamp, points.last().unwrap().timestamp);
    }

    #[test]
    #[should_panic]
    fn rejects_target_below_three() {
        let points: Vec<Sample> = (0..10).map(|i| sample(i as f64, 0.0)).collect();
        downsample_lttb(&points, 2);
    }
}
