//! Route headway estimation from vehicle sighting timestamps.

/// Estimates the spacing between vehicles on one route as the median gap
/// between successive sighting timestamps.
///
/// Timestamps may arrive in any order; they are sorted first. Gaps that would
/// be negative are discarded, zero gaps (duplicate timestamps) are kept.
/// Fewer than two timestamps, or no usable gap, yields `0.0`.
pub fn median_headway(timestamps: &[u64]) -> f64 {
    if timestamps.len() < 2 {
        return 0.0;
    }

    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut gaps: Vec<u64> = sorted
        .windows(2)
        .filter_map(|pair| pair[1].checked_sub(pair[0]))
        .collect();

    median(&mut gaps).unwrap_or(0.0)
}

/// Median with the usual odd/even rule. `None` for an empty slice.
fn median(values: &mut [u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid] as f64)
    } else {
        Some((values[mid - 1] as f64 + values[mid] as f64) / 2.0)
    }
}
