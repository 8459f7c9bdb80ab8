use burn::tensor::backend::Backend;
use tracing::{debug, warn};

use crate::error::{Result, VolumeError};
use crate::image::Image;

const MAX_ITERATIONS: usize = 10_000;

/// Li's iterative minimum cross-entropy threshold.
///
/// `tolerance` defaults to half the smallest gap between distinct
/// intensities and `initial_guess` to the image mean. A constant image
/// returns its single intensity.
pub fn threshold_li<B: Backend, const D: usize>(
    image: &Image<B, D>,
    tolerance: Option<f64>,
    initial_guess: Option<f64>,
) -> Result<f64> {
    li_from_values(&image.to_vec()?, tolerance, initial_guess)
}

pub(crate) fn li_from_values(values: &[f32], tolerance: Option<f64>, initial_guess: Option<f64>) -> Result<f64> {
    let mut values: Vec<f64> = values.iter().filter(|v| !v.is_nan()).map(|&v| v as f64).collect();
    if values.is_empty() {
        return Err(VolumeError::empty_image("no finite intensities to threshold"));
    }
    let first = values[0];
    if values.iter().all(|&v| v == first) {
        return Ok(first);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let tolerance = match tolerance {
        Some(t) if t.is_finite() && t > 0.0 => t,
        Some(t) => {
            return Err(VolumeError::invalid_parameter(format!(
                "tolerance must be positive, got {}",
                t
            )))
        }
        None => smallest_gap(&values) / 2.0,
    };
    let mut next = match initial_guess {
        Some(g) if g > min && g < max => g,
        Some(g) => {
            return Err(VolumeError::invalid_parameter(format!(
                "initial guess {} must lie strictly between {} and {}",
                g, min, max
            )))
        }
        None => values.iter().sum::<f64>() / values.len() as f64,
    };

    // Work on non-negative values so the logarithms are defined.
    for v in values.iter_mut() {
        *v -= min;
    }
    next -= min;
    let mut current = -2.0 * tolerance;
    let mut iterations = 0;

    while (next - current).abs() > tolerance {
        if iterations == MAX_ITERATIONS {
            warn!(iterations, "li threshold did not converge");
            break;
        }
        iterations += 1;
        current = next;

        let (mut fore_sum, mut fore_n, mut back_sum, mut back_n) = (0.0, 0usize, 0.0, 0usize);
        for &v in &values {
            if v > current {
                fore_sum += v;
                fore_n += 1;
            } else {
                back_sum += v;
                back_n += 1;
            }
        }
        if fore_n == 0 || back_n == 0 {
            break;
        }
        let mean_fore = fore_sum / fore_n as f64;
        let mean_back = back_sum / back_n as f64;
        if mean_back == 0.0 {
            break;
        }
        next = (mean_back - mean_fore) / (mean_back.ln() - mean_fore.ln());
    }
    debug!(iterations, threshold = next + min, "li threshold");
    Ok(next + min)
}

fn smallest_gap(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min)
}
