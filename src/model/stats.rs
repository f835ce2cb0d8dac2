//! Order statistics over small samples.

/// Median with linear interpolation: even-sized samples yield the mean of the
/// two middle values. Empty input has no median.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Nearest-rank quantile: the sorted value at `round((n - 1) * q)`, ties to
/// even. `q` is clamped into `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q = q.clamp(0.0, 1.0);
    let pos = ((sorted.len() - 1) as f64 * q).round_ties_even() as usize;
    Some(sorted[pos.min(sorted.len() - 1)])
}
