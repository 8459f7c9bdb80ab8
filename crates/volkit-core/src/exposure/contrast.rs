//! Contrast adjustment: linear rescaling, gamma, log, sigmoid and histogram
//! equalization.

use std::f32::consts::LN_2;

use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolumeError};
use crate::exposure::histogram::{histogram, percentiles};
use crate::image::Image;

/// Input range for [`rescale_intensity`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntensityRange {
    /// Minimum and maximum of the image.
    Image,
    /// Fixed bounds.
    Explicit { low: f64, high: f64 },
    /// Percentile bounds in `[0, 100]`, e.g. 0.5 and 99.5 to ignore outliers.
    Percentiles { low: f64, high: f64 },
}

impl IntensityRange {
    /// Resolve to concrete `(low, high)` bounds for `image`.
    pub fn resolve<B: Backend, const D: usize>(&self, image: &Image<B, D>) -> Result<(f64, f64)> {
        let (low, high) = match *self {
            IntensityRange::Image => {
                let stats = image.statistics()?;
                (stats.min, stats.max)
            }
            IntensityRange::Explicit { low, high } => (low, high),
            IntensityRange::Percentiles { low, high } => {
                let p = percentiles(&image.to_vec()?, &[low, high])?;
                (p[0], p[1])
            }
        };
        if !(low <= high) {
            return Err(VolumeError::invalid_parameter(format!(
                "intensity range is inverted: [{}, {}]",
                low, high
            )));
        }
        Ok((low, high))
    }
}

/// Clip to `in_range` and map it linearly onto `out_range`.
///
/// A degenerate input range maps every voxel to `out_range.0`.
pub fn rescale_intensity<B: Backend, const D: usize>(
    image: &Image<B, D>,
    in_range: IntensityRange,
    out_range: (f64, f64),
) -> Result<Image<B, D>> {
    let (low, high) = in_range.resolve(image)?;
    let (out_low, out_high) = out_range;
    if high - low <= f64::EPSILON {
        let data = Tensor::<B, D>::full(image.shape(), out_low as f32, &image.device());
        return Ok(image.with_data(data));
    }
    let scale = (out_high - out_low) / (high - low);
    let data = image
        .data()
        .clone()
        .clamp(low as f32, high as f32)
        .sub_scalar(low as f32)
        .mul_scalar(scale as f32)
        .add_scalar(out_low as f32);
    Ok(image.with_data(data))
}

fn ensure_non_negative<B: Backend, const D: usize>(image: &Image<B, D>, op: &str) -> Result<()> {
    let min = image.statistics()?.min;
    if min < 0.0 {
        return Err(VolumeError::invalid_parameter(format!(
            "{} requires non-negative intensities, found minimum {}",
            op, min
        )));
    }
    Ok(())
}

/// Power-law correction `gain * I^gamma`.
pub fn adjust_gamma<B: Backend, const D: usize>(image: &Image<B, D>, gamma: f64, gain: f64) -> Result<Image<B, D>> {
    if !(gamma.is_finite() && gamma >= 0.0) {
        return Err(VolumeError::invalid_parameter(format!(
            "gamma must be non-negative, got {}",
            gamma
        )));
    }
    ensure_non_negative(image, "gamma correction")?;
    let data = image.data().clone().powf_scalar(gamma as f32).mul_scalar(gain as f32);
    Ok(image.with_data(data))
}

/// Logarithmic correction `gain * log2(1 + I)`, or its inverse
/// `gain * (2^I - 1)`.
pub fn adjust_log<B: Backend, const D: usize>(image: &Image<B, D>, gain: f64, inverse: bool) -> Result<Image<B, D>> {
    ensure_non_negative(image, "log correction")?;
    let data = image.data().clone();
    let data = if inverse {
        data.mul_scalar(LN_2).exp().sub_scalar(1.0).mul_scalar(gain as f32)
    } else {
        data.log1p().div_scalar(LN_2).mul_scalar(gain as f32)
    };
    Ok(image.with_data(data))
}

/// Sigmoid correction `1 / (1 + exp(gain * (cutoff - I)))`, or `1 - that`
/// when `inverse` is set.
pub fn adjust_sigmoid<B: Backend, const D: usize>(
    image: &Image<B, D>,
    cutoff: f64,
    gain: f64,
    inverse: bool,
) -> Result<Image<B, D>> {
    let out = sigmoid(image.data().clone().sub_scalar(cutoff as f32).mul_scalar(gain as f32));
    let out = if inverse { out.neg().add_scalar(1.0) } else { out };
    Ok(image.with_data(out))
}

/// Histogram equalization onto `[0, 1]`.
///
/// Each voxel is mapped through the normalized cumulative histogram,
/// interpolating linearly between bin centers and clamping outside them.
pub fn equalize_hist<B: Backend, const D: usize>(image: &Image<B, D>, nbins: usize) -> Result<Image<B, D>> {
    let values = image.to_vec()?;
    let hist = histogram(&values, nbins)?;
    let cdf = hist.normalized_cdf();
    let centers = &hist.bin_centers;

    let mapped = values
        .iter()
        .map(|&v| interpolate(v as f64, centers, &cdf) as f32)
        .collect();
    image.with_values(mapped)
}

/// Piecewise-linear interpolation of `ys` over increasing `xs`.
fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let upper = xs.partition_point(|&c| c <= x);
    let lower = upper - 1;
    let t = (x - xs[lower]) / (xs[upper] - xs[lower]);
    ys[lower] + t * (ys[upper] - ys[lower])
}
