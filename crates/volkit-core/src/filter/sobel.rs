//! Sobel edge filter.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{Result, VolumeError};
use crate::filter::convolution::correlate_axis;
use crate::image::Image;

const DERIVATIVE: [f32; 3] = [-1.0, 0.0, 1.0];
const SMOOTHING: [f32; 3] = [0.25, 0.5, 0.25];

/// Sobel gradient and edge magnitude over a chosen set of axes.
///
/// For every participating axis the derivative kernel runs along that axis
/// and the smoothing kernel along the other participating axes. Axes that do
/// not participate are left untouched, so restricting a volume to its two
/// in-plane axes yields an independent 2D edge map for every plane.
#[derive(Debug, Clone, Default)]
pub struct SobelFilter {
    axes: Option<Vec<usize>>,
}

impl SobelFilter {
    /// Filter over every axis of the image.
    pub fn new() -> Self {
        Self { axes: None }
    }

    /// In-plane filter for volumes: rows and columns only.
    pub fn planewise() -> Self {
        Self { axes: Some(vec![1, 2]) }
    }

    pub fn with_axes(axes: Vec<usize>) -> Self {
        Self { axes: Some(axes) }
    }

    fn resolve_axes<const D: usize>(&self) -> Result<Vec<usize>> {
        let axes = match &self.axes {
            Some(axes) => axes.clone(),
            None => (0..D).collect(),
        };
        if axes.is_empty() {
            return Err(VolumeError::invalid_parameter("sobel needs at least one axis"));
        }
        if let Some(&bad) = axes.iter().find(|&&a| a >= D) {
            return Err(VolumeError::invalid_parameter(format!(
                "axis {} out of range for a {}D image",
                bad, D
            )));
        }
        Ok(axes)
    }

    /// Gradient along `axis`; positive where intensity increases with the index.
    pub fn gradient<B: Backend, const D: usize>(&self, image: &Image<B, D>, axis: usize) -> Result<Image<B, D>> {
        let axes = self.resolve_axes::<D>()?;
        if !axes.contains(&axis) {
            return Err(VolumeError::invalid_parameter(format!(
                "axis {} is not one of the filter axes {:?}",
                axis, axes
            )));
        }
        Ok(image.with_data(gradient_tensor(image.data().clone(), &axes, axis)))
    }

    /// Edge magnitude `sqrt(sum_a G_a^2 / n_axes)`.
    pub fn magnitude<B: Backend, const D: usize>(&self, image: &Image<B, D>) -> Result<Image<B, D>> {
        let axes = self.resolve_axes::<D>()?;
        let mut sum: Option<Tensor<B, D>> = None;
        for &axis in &axes {
            let g = gradient_tensor(image.data().clone(), &axes, axis);
            let sq = g.powf_scalar(2.0);
            sum = Some(match sum {
                Some(acc) => acc + sq,
                None => sq,
            });
        }
        // resolve_axes guarantees at least one axis
        let sum = sum.ok_or_else(|| VolumeError::invalid_parameter("sobel needs at least one axis"))?;
        Ok(image.with_data(sum.div_scalar(axes.len() as f32).sqrt()))
    }
}

fn gradient_tensor<B: Backend, const D: usize>(input: Tensor<B, D>, axes: &[usize], axis: usize) -> Tensor<B, D> {
    let mut data = correlate_axis(input, &DERIVATIVE, axis);
    for &other in axes.iter().filter(|&&a| a != axis) {
        data = correlate_axis(data, &SMOOTHING, other);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageMetadata;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    /// 3 planes of 5x6; columns >= 3 are bright.
    fn step_volume() -> Image<Backend, 3> {
        let device = Default::default();
        let mut values = Vec::new();
        for _z in 0..3 {
            for _y in 0..5 {
                for x in 0..6 {
                    values.push(if x >= 3 { 1.0 } else { 0.0 });
                }
            }
        }
        Image::from_vec([3, 5, 6], values, &ImageMetadata::default(), &device).unwrap()
    }

    #[test]
    fn test_planewise_step_edge() {
        let image = step_volume();
        let edges = SobelFilter::planewise().magnitude(&image).unwrap();
        let v = edges.to_vec().unwrap();
        let at = |z: usize, y: usize, x: usize| v[z * 30 + y * 6 + x];
        let expected = (0.5f32).sqrt();
        assert!((at(1, 2, 2) - expected).abs() < 1e-5);
        assert!((at(1, 2, 3) - expected).abs() < 1e-5);
        assert!(at(1, 2, 0).abs() < 1e-6);
        assert!(at(0, 0, 5).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_sign() {
        let image = step_volume();
        let g = SobelFilter::new().gradient(&image, 2).unwrap();
        let v = g.to_vec().unwrap();
        assert!(v[30 + 12 + 2] > 0.0);
        let g_rows = SobelFilter::new().gradient(&image, 1).unwrap();
        assert!(g_rows.to_vec().unwrap().iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_invalid_axes() {
        let image = step_volume();
        assert!(SobelFilter::with_axes(vec![3]).magnitude(&image).is_err());
        assert!(SobelFilter::with_axes(vec![]).magnitude(&image).is_err());
        assert!(SobelFilter::planewise().gradient(&image, 0).is_err());
    }
}
