use burn::tensor::backend::Backend;

use crate::error::Result;
use crate::exposure::histogram::histogram;
use crate::image::Image;

/// Otsu's threshold: the bin center that maximizes the between-class
/// variance of the intensity histogram.
///
/// A constant image returns its single intensity.
pub fn threshold_otsu<B: Backend, const D: usize>(image: &Image<B, D>, nbins: usize) -> Result<f64> {
    otsu_from_values(&image.to_vec()?, nbins)
}

pub(crate) fn otsu_from_values(values: &[f32], nbins: usize) -> Result<f64> {
    let hist = histogram(values, nbins)?;
    if hist.nbins() == 1 {
        return Ok(hist.bin_centers[0]);
    }

    let n = hist.nbins();
    let counts: Vec<f64> = hist.counts.iter().map(|&c| c as f64).collect();
    let centers = &hist.bin_centers;

    // Class weights and means for "at or below bin i" and "at or above bin i".
    let mut weight_low = vec![0.0; n];
    let mut mean_low = vec![0.0; n];
    let (mut w, mut m) = (0.0, 0.0);
    for i in 0..n {
        w += counts[i];
        m += counts[i] * centers[i];
        weight_low[i] = w;
        mean_low[i] = if w > 0.0 { m / w } else { 0.0 };
    }
    let mut weight_high = vec![0.0; n];
    let mut mean_high = vec![0.0; n];
    let (mut w, mut m) = (0.0, 0.0);
    for i in (0..n).rev() {
        w += counts[i];
        m += counts[i] * centers[i];
        weight_high[i] = w;
        mean_high[i] = if w > 0.0 { m / w } else { 0.0 };
    }

    let mut best = 0;
    let mut best_variance = f64::NEG_INFINITY;
    for i in 0..n - 1 {
        let diff = mean_low[i] - mean_high[i + 1];
        let variance = weight_low[i] * weight_high[i + 1] * diff * diff;
        if variance > best_variance {
            best_variance = variance;
            best = i;
        }
    }
    Ok(centers[best])
}
