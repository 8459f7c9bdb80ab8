//! Binary volumes.

use burn::tensor::backend::Backend;

use crate::error::{Result, VolumeError};
use crate::image::{Grid, Image, ImageMetadata};

/// Host-side boolean volume, the output of thresholding and the operand of
/// binary morphology.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    grid: Grid,
    data: Vec<bool>,
    metadata: ImageMetadata<3>,
}

impl Mask {
    pub fn new(shape: [usize; 3], data: Vec<bool>, metadata: ImageMetadata<3>) -> Result<Self> {
        let grid = Grid::new(shape);
        if data.len() != grid.len() {
            return Err(VolumeError::invalid_parameter(format!(
                "expected {} mask values for shape {:?}, got {}",
                grid.len(),
                shape,
                data.len()
            )));
        }
        Ok(Self { grid, data, metadata })
    }

    pub fn filled(shape: [usize; 3], value: bool, metadata: ImageMetadata<3>) -> Self {
        let grid = Grid::new(shape);
        Self {
            grid,
            data: vec![value; grid.len()],
            metadata,
        }
    }

    /// Evaluate `predicate` on every voxel of `image`.
    pub fn from_image<B: Backend>(image: &Image<B, 3>, predicate: impl Fn(f32) -> bool) -> Result<Self> {
        let values = image.to_vec()?;
        let data = values.into_iter().map(predicate).collect();
        Self::new(image.shape(), data, image.metadata())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn shape(&self) -> [usize; 3] {
        self.grid.shape()
    }

    pub fn metadata(&self) -> &ImageMetadata<3> {
        &self.metadata
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    pub fn get(&self, coords: [usize; 3]) -> bool {
        self.data[self.grid.index(coords)]
    }

    pub fn set(&mut self, coords: [usize; 3], value: bool) {
        let idx = self.grid.index(coords);
        self.data[idx] = value;
    }

    /// Number of foreground voxels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Same grid and geometry, new values.
    pub(crate) fn with_data(&self, data: Vec<bool>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            grid: self.grid,
            data,
            metadata: self.metadata,
        }
    }

    pub fn invert(&self) -> Self {
        self.with_data(self.data.iter().map(|&v| !v).collect())
    }

    pub fn and(&self, other: &Mask) -> Result<Self> {
        self.grid.ensure_same(other.shape())?;
        Ok(self.with_data(
            self.data.iter().zip(&other.data).map(|(&a, &b)| a && b).collect(),
        ))
    }

    pub fn or(&self, other: &Mask) -> Result<Self> {
        self.grid.ensure_same(other.shape())?;
        Ok(self.with_data(
            self.data.iter().zip(&other.data).map(|(&a, &b)| a || b).collect(),
        ))
    }

    /// Foreground as 1.0, background as 0.0.
    pub fn to_image<B: Backend>(&self, device: &B::Device) -> Result<Image<B, 3>> {
        let values = self.data.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect();
        Image::from_vec(self.shape(), values, &self.metadata, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn test_from_image_threshold() {
        let device = Default::default();
        let image = Image::<Backend, 3>::from_vec(
            [1, 2, 2],
            vec![0.1, 0.6, 0.4, 0.9],
            &ImageMetadata::default(),
            &device,
        )
        .unwrap();
        let mask = Mask::from_image(&image, |v| v > 0.5).unwrap();
        assert_eq!(mask.as_slice(), &[false, true, false, true]);
        assert_eq!(mask.count(), 2);
    }

    #[test]
    fn test_logic_ops() {
        let meta = ImageMetadata::default();
        let a = Mask::new([1, 1, 4], vec![true, true, false, false], meta).unwrap();
        let b = Mask::new([1, 1, 4], vec![true, false, true, false], meta).unwrap();
        assert_eq!(a.and(&b).unwrap().as_slice(), &[true, false, false, false]);
        assert_eq!(a.or(&b).unwrap().as_slice(), &[true, true, true, false]);
        assert_eq!(a.invert().as_slice(), &[false, false, true, true]);

        let c = Mask::filled([1, 2, 2], false, meta);
        assert!(matches!(a.and(&c), Err(VolumeError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_to_image() {
        let device = Default::default();
        let mask = Mask::new([1, 1, 3], vec![true, false, true], ImageMetadata::default()).unwrap();
        let image: Image<Backend, 3> = mask.to_image(&device).unwrap();
        assert_eq!(image.to_vec().unwrap(), vec![1.0, 0.0, 1.0]);
    }
}
