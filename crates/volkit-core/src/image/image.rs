//! Image type with physical metadata and coordinate transformations.
//!
//! Voxel values live in a burn tensor; geometry (origin, spacing, direction)
//! lives next to it on the CPU. Operations that need random neighbourhood
//! access pull the values to the host with [`Image::to_vec`] and push results
//! back with [`Image::with_values`], keeping the geometry untouched.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Shape, Tensor, TensorData};
use serde::Serialize;

use crate::error::{Result, VolumeError};
use crate::image::ImageMetadata;
use crate::spatial::{Direction, Point, Spacing};

/// Image with physical metadata.
///
/// # Type Parameters
/// * `B` - The tensor backend
/// * `D` - The dimensionality of the image (2 or 3)
///
/// # Coordinate Systems
/// * **Index Space**: voxel indices in tensor axis order (plane, row, column)
/// * **Physical Space**: `point = origin + Direction * (index * spacing)`
///
/// # Examples
/// ```rust
/// use volkit_core::Image;
/// use volkit_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
/// let image = Image::new(
///     data,
///     Point3::new([0.0, 0.0, 0.0]),
///     Spacing3::new([0.29, 0.26, 0.26]),
///     Direction3::identity(),
/// );
/// assert_eq!(image.shape(), [10, 10, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
}

/// Summary statistics of voxel intensities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl<B: Backend, const D: usize> Image<B, D> {
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    /// Build an image from host values in row-major (C) order.
    pub fn from_vec(
        shape: [usize; D],
        values: Vec<f32>,
        metadata: &ImageMetadata<D>,
        device: &B::Device,
    ) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(VolumeError::invalid_parameter(format!(
                "expected {} values for shape {:?}, got {}",
                expected,
                shape,
                values.len()
            )));
        }
        metadata.spacing().validate()?;
        let tensor = Tensor::<B, D>::from_data(TensorData::new(values, Shape::new(shape)), device);
        Ok(Self::new(
            tensor,
            *metadata.origin(),
            *metadata.spacing(),
            *metadata.direction(),
        ))
    }

    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    pub fn into_data(self) -> Tensor<B, D> {
        self.data
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Geometry of this image, for attaching to derived masks and label maps.
    pub fn metadata(&self) -> ImageMetadata<D> {
        ImageMetadata::new(self.origin, self.spacing, self.direction)
    }

    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    pub fn num_voxels(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn device(&self) -> B::Device {
        self.data.device()
    }

    /// Copy voxel values to the host in row-major order.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        self.data
            .to_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| VolumeError::data_conversion(format!("{:?}", e)))
    }

    /// Same geometry, new voxel tensor.
    pub fn with_data(&self, data: Tensor<B, D>) -> Self {
        Self::new(data, self.origin, self.spacing, self.direction)
    }

    /// Same geometry, new host values (row-major, same shape).
    pub fn with_values(&self, values: Vec<f32>) -> Result<Self> {
        Self::from_vec(self.shape(), values, &self.metadata(), &self.device())
    }

    /// Replace the spacing, e.g. when the file format does not carry it.
    pub fn with_spacing(mut self, spacing: Spacing<D>) -> Result<Self> {
        spacing.validate()?;
        self.spacing = spacing;
        Ok(self)
    }

    /// Minimum, maximum, mean and (population) standard deviation.
    pub fn statistics(&self) -> Result<ImageStatistics> {
        if self.num_voxels() == 0 {
            return Err(VolumeError::empty_image("cannot compute statistics of an empty image"));
        }
        let min = self.data.clone().min().into_scalar().elem::<f64>();
        let max = self.data.clone().max().into_scalar().elem::<f64>();
        let mean = self.data.clone().mean().into_scalar().elem::<f64>();
        let variance = (self.data.clone() - mean as f32)
            .powf_scalar(2.0)
            .mean()
            .into_scalar()
            .elem::<f64>();
        Ok(ImageStatistics {
            min,
            max,
            mean,
            std: variance.max(0.0).sqrt(),
        })
    }

    /// Map a physical point to a continuous index:
    /// `index = (Direction^-1 * (point - origin)) / spacing`.
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Result<Point<D>> {
        let inv_dir = self
            .direction
            .try_inverse()
            .ok_or_else(|| VolumeError::invalid_parameter("direction matrix is singular"))?;
        let rotated = inv_dir * (*point - self.origin);

        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        Ok(index)
    }

    /// Map a continuous index to a physical point:
    /// `point = origin + Direction * (index * spacing)`.
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        self.metadata().index_to_physical_point(index)
    }
}

impl<B: Backend> Image<B, 3> {
    /// Extract the 2D plane at `index` along `axis`.
    ///
    /// The plane keeps the spacing and direction of the remaining axes and its
    /// origin is the physical position of its first voxel.
    pub fn plane(&self, axis: usize, index: usize) -> Result<Image<B, 2>> {
        let shape = self.shape();
        if axis >= 3 {
            return Err(VolumeError::invalid_parameter(format!(
                "axis {} out of range for a 3D image",
                axis
            )));
        }
        if index >= shape[axis] {
            return Err(VolumeError::invalid_parameter(format!(
                "plane {} out of range, axis {} has {} planes",
                index, axis, shape[axis]
            )));
        }

        let kept: Vec<usize> = (0..3).filter(|&a| a != axis).collect();
        let data = self
            .data
            .clone()
            .narrow(axis, index, 1)
            .reshape([shape[kept[0]], shape[kept[1]]]);

        let mut first = Point::<3>::origin();
        first[axis] = index as f64;
        let origin = self.transform_continuous_index_to_physical_point(&first);

        Ok(Image::new(
            data,
            origin.drop_axis(axis),
            self.spacing.drop_axis_spacing(axis),
            self.direction.drop_axis(axis),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;
    type Point3 = Point<3>;
    type Spacing3 = Spacing<3>;
    type Direction3 = Direction<3>;

    fn ramp(shape: [usize; 3], spacing: Spacing3) -> Image<Backend, 3> {
        let device = Default::default();
        let n: usize = shape.iter().product();
        let values: Vec<f32> = (0..n).map(|v| v as f32).collect();
        let metadata = ImageMetadata::new(Point3::origin(), spacing, Direction3::identity());
        Image::from_vec(shape, values, &metadata, &device).unwrap()
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let device = Default::default();
        let metadata = ImageMetadata::<3>::default();
        let result = Image::<Backend, 3>::from_vec([2, 2, 2], vec![0.0; 7], &metadata, &device);
        assert!(matches!(result, Err(VolumeError::InvalidParameter(_))));
    }

    #[test]
    fn test_to_vec_roundtrip() {
        let image = ramp([2, 3, 4], Spacing3::uniform(1.0));
        let values = image.to_vec().unwrap();
        assert_eq!(values.len(), 24);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[23], 23.0);
    }

    #[test]
    fn test_statistics() {
        let image = ramp([1, 1, 4], Spacing3::uniform(1.0));
        let stats = image.statistics().unwrap();
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 1.5).abs() < 1e-6);
        assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_non_unit_spacing_transform() {
        let image = ramp([10, 10, 10], Spacing3::new([2.0, 2.0, 2.0]));
        let index = image
            .transform_physical_point_to_continuous_index(&Point3::new([10.0, 10.0, 10.0]))
            .unwrap();
        assert!((index[0] - 5.0).abs() < 1e-9);
        assert!((index[2] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_roundtrip_with_origin() {
        let device = Default::default();
        let data = Tensor::<Backend, 3>::zeros([4, 4, 4], &device);
        let image = Image::new(
            data,
            Point3::new([10.0, 20.0, 30.0]),
            Spacing3::new([0.5, 1.0, 2.0]),
            Direction3::identity(),
        );
        let point = Point3::new([11.0, 22.5, 37.0]);
        let index = image.transform_physical_point_to_continuous_index(&point).unwrap();
        let back = image.transform_continuous_index_to_physical_point(&index);
        for i in 0..3 {
            assert!((point[i] - back[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_plane_extraction() {
        let image = ramp([3, 2, 4], Spacing3::new([2.0, 0.5, 0.25]));
        let plane = image.plane(0, 1).unwrap();
        assert_eq!(plane.shape(), [2, 4]);
        assert_eq!(plane.spacing().to_array(), [0.5, 0.25]);
        assert_eq!(plane.origin().to_array(), [0.0, 0.0]);
        let values = plane.to_vec().unwrap();
        assert_eq!(values[0], 8.0);
        assert_eq!(values[7], 15.0);

        let column_plane = image.plane(2, 3).unwrap();
        assert_eq!(column_plane.shape(), [3, 2]);
        assert_eq!(column_plane.to_vec().unwrap()[0], 3.0);
    }

    #[test]
    fn test_plane_out_of_range() {
        let image = ramp([3, 2, 4], Spacing3::uniform(1.0));
        assert!(image.plane(0, 3).is_err());
        assert!(image.plane(3, 0).is_err());
    }
}
