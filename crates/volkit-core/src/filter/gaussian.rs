use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::filter::convolution::correlate_axis;
use crate::image::Image;
use crate::spatial::Spacing;

/// Gaussian smoothing filter.
///
/// Applies separable 1D convolutions along each axis. Sigmas are given in
/// physical units and converted to voxels with the image spacing, so an
/// anisotropic volume is smoothed by the same physical amount on every axis.
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    sigmas: Vec<f64>,
    truncate: f64,
    max_kernel_width: Option<usize>,
}

impl GaussianFilter {
    /// Create a filter with per-axis standard deviations (physical units).
    ///
    /// A single sigma applies to every axis; a sigma of zero or less skips
    /// that axis.
    pub fn new(sigmas: Vec<f64>) -> Self {
        Self {
            sigmas,
            truncate: 4.0,
            max_kernel_width: None,
        }
    }

    /// Same sigma along every axis.
    pub fn isotropic(sigma: f64) -> Self {
        Self::new(vec![sigma])
    }

    /// Kernel radius in standard deviations (default 4).
    pub fn with_truncate(mut self, truncate: f64) -> Self {
        self.truncate = truncate;
        self
    }

    /// Cap the kernel width (radius * 2 + 1).
    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = Some(width.max(1));
        self
    }

    pub fn apply<B: Backend, const D: usize>(&self, image: &Image<B, D>) -> Result<Image<B, D>> {
        let data = self.apply_tensor(image.data().clone(), image.spacing())?;
        Ok(image.with_data(data))
    }

    /// Apply the filter to a tensor with the given spacing.
    pub fn apply_tensor<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        spacing: &Spacing<D>,
    ) -> Result<Tensor<B, D>> {
        if self.sigmas.is_empty() {
            return Err(VolumeError::invalid_parameter("at least one sigma is required"));
        }
        if self.sigmas.len() != 1 && self.sigmas.len() != D {
            return Err(VolumeError::invalid_parameter(format!(
                "expected 1 or {} sigmas, got {}",
                D,
                self.sigmas.len()
            )));
        }
        if self.sigmas.iter().any(|s| !s.is_finite()) {
            return Err(VolumeError::invalid_parameter("sigmas must be finite"));
        }

        let mut data = input;
        for d in 0..D {
            let sigma = if self.sigmas.len() == 1 { self.sigmas[0] } else { self.sigmas[d] };
            if sigma <= 1e-6 {
                continue;
            }

            let pixel_sigma = sigma / spacing[d];
            let mut radius = (self.truncate * pixel_sigma).ceil() as usize;
            if let Some(max_width) = self.max_kernel_width {
                radius = radius.min((max_width - 1) / 2);
            }
            let kernel = gaussian_kernel(pixel_sigma, radius);
            debug!(axis = d, pixel_sigma, radius, "gaussian pass");
            data = correlate_axis(data, &kernel, d);
        }
        Ok(data)
    }
}

/// Normalized, unscaled Gaussian samples at `-radius..=radius`.
pub(crate) fn gaussian_kernel(sigma: f64, radius: usize) -> Vec<f32> {
    let two_sigma2 = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (0..=(2 * radius))
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma2).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}
