//! Linear-interpolated percentiles over a numeric sample.

use serde::{Deserialize, Serialize};

/// Percentile of `sample` at rank `p` (0.0 to 1.0).
///
/// Sorts a copy, takes the fractional rank `(n - 1) * p` and interpolates
/// between the two bracketing order statistics. An empty sample yields 0.
pub fn percentile(sample: &[f64], p: f64) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

/// Several percentiles with a single sort.
pub fn percentiles(sample: &[f64], ps: &[f64]) -> Vec<f64> {
    if sample.is_empty() {
        return vec![0.0; ps.len()];
    }
    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);
    ps.iter().map(|&p| percentile_sorted(&sorted, p)).collect()
}

/// Percentile of an already ascending sample.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
            let rank = (n - 1) as f64 * p;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let weight = rank - lo as f64;
                sorted[lo] + (sorted[hi] - sorted[lo]) * weight
            }
        }
    }
}

/// Median and interquartile bounds of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quartiles {
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
}

impl Quartiles {
    pub fn of(sample: &[f64]) -> Self {
        let q = percentiles(sample, &[0.25, 0.5, 0.75]);
        Self {
            p25: q[0],
            median: q[1],
            p75: q[2],
        }
    }

    /// Interquartile range.
    pub fn iqr(&self) -> f64 {
        self.p75 - self.p25
    }
}
