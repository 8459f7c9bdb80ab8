//! Edge-preserving bilateral smoothing.

use burn::tensor::backend::Backend;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::image::{Grid, Image};

/// Bilateral filter parameters.
///
/// Each voxel becomes a weighted mean of its window where the weight is the
/// product of a spatial Gaussian (physical distance, so spacing matters) and
/// a range Gaussian on the intensity difference to the centre voxel.
#[derive(Debug, Clone)]
pub struct BilateralFilter {
    /// Spatial standard deviation in physical units.
    pub sigma_spatial: f64,
    /// Range standard deviation; `None` uses the image standard deviation.
    pub sigma_color: Option<f64>,
    /// Upper bound on the window radius along any axis, in voxels.
    pub max_radius: usize,
}

impl Default for BilateralFilter {
    fn default() -> Self {
        Self {
            sigma_spatial: 1.0,
            sigma_color: None,
            max_radius: 5,
        }
    }
}

impl BilateralFilter {
    pub fn new(sigma_spatial: f64) -> Self {
        Self {
            sigma_spatial,
            ..Default::default()
        }
    }

    pub fn with_sigma_color(mut self, sigma: f64) -> Self {
        self.sigma_color = Some(sigma);
        self
    }

    pub fn with_max_radius(mut self, radius: usize) -> Self {
        self.max_radius = radius;
        self
    }

    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Result<Image<B, 3>> {
        if !(self.sigma_spatial.is_finite() && self.sigma_spatial > 0.0) {
            return Err(VolumeError::invalid_parameter("sigma_spatial must be positive"));
        }
        let grid = Grid::new(image.shape());
        if grid.is_empty() {
            return Ok(image.clone());
        }
        let sigma_color = match self.sigma_color {
            Some(s) if s.is_finite() && s > 0.0 => s,
            Some(_) => return Err(VolumeError::invalid_parameter("sigma_color must be positive")),
            None => image.statistics()?.std,
        };
        if sigma_color <= f64::EPSILON {
            // Constant image: nothing to smooth.
            return Ok(image.clone());
        }

        let spacing = image.spacing();
        let radius: Vec<isize> = (0..3)
            .map(|a| ((3.0 * self.sigma_spatial / spacing[a]).ceil() as usize).min(self.max_radius) as isize)
            .collect();
        let two_ss = 2.0 * self.sigma_spatial * self.sigma_spatial;
        let mut window: Vec<([isize; 3], f32)> = Vec::new();
        for dz in -radius[0]..=radius[0] {
            for dy in -radius[1]..=radius[1] {
                for dx in -radius[2]..=radius[2] {
                    let d2 = (dz as f64 * spacing[0]).powi(2)
                        + (dy as f64 * spacing[1]).powi(2)
                        + (dx as f64 * spacing[2]).powi(2);
                    window.push(([dz, dy, dx], (-d2 / two_ss).exp() as f32));
                }
            }
        }
        debug!(?radius, sigma_color, taps = window.len(), "bilateral window");

        let values = image.to_vec()?;
        let inv_two_sc = 1.0 / (2.0 * sigma_color * sigma_color) as f32;
        let [_, rows, cols] = grid.shape();

        let mut out = vec![0.0f32; grid.len()];
        out.par_chunks_mut(rows * cols)
            .enumerate()
            .for_each(|(z, plane)| {
                for y in 0..rows {
                    for x in 0..cols {
                        let centre = values[grid.index([z, y, x])];
                        let mut sum = 0.0f32;
                        let mut weight_sum = 0.0f32;
                        for &(offset, spatial) in &window {
                            let Some(n) = grid.offset([z, y, x], offset) else {
                                continue;
                            };
                            let v = values[n];
                            let diff = v - centre;
                            let w = spatial * (-diff * diff * inv_two_sc).exp();
                            sum += w * v;
                            weight_sum += w;
                        }
                        plane[y * cols + x] = if weight_sum > 0.0 { sum / weight_sum } else { centre };
                    }
                }
            });

        image.with_values(out)
    }
}
