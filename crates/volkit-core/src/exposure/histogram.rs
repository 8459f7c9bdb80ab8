//! Intensity histograms and percentiles.

use serde::Serialize;

use crate::error::{Result, VolumeError};

/// Equal-width histogram of intensity values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub counts: Vec<usize>,
    pub bin_centers: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

impl Histogram {
    pub fn nbins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Bin width (zero for a constant input).
    pub fn bin_width(&self) -> f64 {
        if self.counts.len() <= 1 {
            return self.max - self.min;
        }
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Cumulative counts normalized so the last entry is 1.
    pub fn normalized_cdf(&self) -> Vec<f64> {
        let total = self.total().max(1) as f64;
        let mut acc = 0usize;
        self.counts
            .iter()
            .map(|&c| {
                acc += c;
                acc as f64 / total
            })
            .collect()
    }
}

/// Histogram over `nbins` equal-width bins spanning the finite values.
///
/// NaN values are ignored. A constant input produces a single bin.
pub fn histogram(values: &[f32], nbins: usize) -> Result<Histogram> {
    if nbins == 0 {
        return Err(VolumeError::invalid_parameter("nbins must be at least 1"));
    }
    let finite = || values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v as f64), hi.max(v as f64))
    });
    if !min.is_finite() {
        return Err(VolumeError::empty_image("histogram of an image without finite values"));
    }

    if max - min <= f64::EPSILON * max.abs().max(1.0) {
        return Ok(Histogram {
            counts: vec![finite().count()],
            bin_centers: vec![min],
            min,
            max,
        });
    }

    let width = (max - min) / nbins as f64;
    let mut counts = vec![0usize; nbins];
    for v in finite() {
        let bin = (((v as f64 - min) / width) as usize).min(nbins - 1);
        counts[bin] += 1;
    }
    let bin_centers = (0..nbins).map(|i| min + (i as f64 + 0.5) * width).collect();
    Ok(Histogram {
        counts,
        bin_centers,
        min,
        max,
    })
}

/// The `q`-th percentile (0..=100) with linear interpolation between ranks.
pub fn percentile(values: &[f32], q: f64) -> Result<f64> {
    percentiles(values, &[q]).map(|p| p[0])
}

/// Several percentiles with a single sort.
pub fn percentiles(values: &[f32], qs: &[f64]) -> Result<Vec<f64>> {
    if let Some(q) = qs.iter().find(|q| !(0.0..=100.0).contains(*q)) {
        return Err(VolumeError::invalid_parameter(format!(
            "percentile must lie in [0, 100], got {}",
            q
        )));
    }
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(VolumeError::empty_image("percentile of an empty image"));
    }
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));

    let last = (sorted.len() - 1) as f64;
    Ok(qs
        .iter()
        .map(|q| {
            let rank = q / 100.0 * last;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
        })
        .collect())
}
