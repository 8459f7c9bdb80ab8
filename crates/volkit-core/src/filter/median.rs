//! Median filter over an arbitrary footprint.

use burn::tensor::backend::Backend;
use rayon::prelude::*;

use crate::error::{Result, VolumeError};
use crate::image::{Grid, Image};
use crate::morphology::StructuringElement;

/// Replaces each voxel with the median of its footprint neighbourhood.
///
/// Neighbours outside the volume take the value of the nearest edge voxel.
/// With an even number of footprint voxels the upper median is used.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    footprint: StructuringElement,
}

impl Default for MedianFilter {
    fn default() -> Self {
        Self::new(StructuringElement::ball(1))
    }
}

impl MedianFilter {
    pub fn new(footprint: StructuringElement) -> Self {
        Self { footprint }
    }

    pub fn footprint(&self) -> &StructuringElement {
        &self.footprint
    }

    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Result<Image<B, 3>> {
        if self.footprint.is_empty() {
            return Err(VolumeError::invalid_parameter("median footprint is empty"));
        }
        let grid = Grid::new(image.shape());
        if grid.is_empty() {
            return Ok(image.clone());
        }
        let values = image.to_vec()?;
        let offsets = self.footprint.offsets();
        let [_, rows, cols] = grid.shape();
        let mid = offsets.len() / 2;

        let mut out = vec![0.0f32; grid.len()];
        out.par_chunks_mut(rows * cols)
            .enumerate()
            .for_each(|(z, plane)| {
                let mut window = Vec::with_capacity(offsets.len());
                for y in 0..rows {
                    for x in 0..cols {
                        window.clear();
                        window.extend(offsets.iter().map(|&o| values[grid.clamped([z, y, x], o)]));
                        let (_, median, _) = window.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
                        plane[y * cols + x] = *median;
                    }
                }
            });

        image.with_values(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageMetadata;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn test_removes_salt_noise() {
        let device = Default::default();
        let mut values = vec![1.0f32; 5 * 5 * 5];
        values[2 * 25 + 2 * 5 + 2] = 100.0;
        let image = Image::<Backend, 3>::from_vec([5, 5, 5], values, &ImageMetadata::default(), &device).unwrap();
        let out = MedianFilter::default().apply(&image).unwrap();
        assert!(out.to_vec().unwrap().iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_preserves_step_edge() {
        let device = Default::default();
        let values: Vec<f32> = (0..4 * 4 * 4).map(|i| if i % 4 >= 2 { 10.0 } else { 0.0 }).collect();
        let image = Image::<Backend, 3>::from_vec([4, 4, 4], values.clone(), &ImageMetadata::default(), &device).unwrap();
        let out = MedianFilter::new(StructuringElement::ball(1)).apply(&image).unwrap();
        assert_eq!(out.to_vec().unwrap(), values);
    }
}
