use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::{SMatrix, Vector3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;
use tracing::{info, warn};
use volkit_core::error::VolumeError;
use volkit_core::image::{Image, ImageMetadata, LabelMap};
use volkit_core::spatial::{Direction, Point, Spacing};

/// Read a NIfTI volume (`.nii` or `.nii.gz`).
///
/// NIfTI stores voxels as `[x, y, z]`; the image is returned in
/// `[z, y, x]` (plane, row, column) order with spacing and direction
/// reordered to match. Two-dimensional files become a single plane.
pub fn read_nifti<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, 3>> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let metadata = metadata_from_header(obj.header());

    let volume = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;
    let dims = volume.shape().to_vec();
    let [nx, ny, nz] = match dims.as_slice() {
        [nx, ny] => [*nx, *ny, 1],
        [nx, ny, nz] => [*nx, *ny, *nz],
        [nx, ny, nz, 1] => [*nx, *ny, *nz],
        other => {
            return Err(VolumeError::UnsupportedDimension {
                expected: 3,
                actual: other.len(),
            })
            .with_context(|| format!("Unsupported NIfTI shape {:?} in {}", other, path.display()));
        }
    };

    // Logical (row-major) order, independent of the array's memory layout.
    let values: Vec<f32> = volume.iter().copied().collect();
    let tensor = Tensor::<B, 3>::from_data(TensorData::new(values, Shape::new([nx, ny, nz])), device)
        .permute([2, 1, 0]);

    info!(path = %path.display(), shape = ?[nz, ny, nx], spacing = ?metadata.spacing().to_array(), "read NIfTI");
    Ok(Image::new(
        tensor,
        *metadata.origin(),
        *metadata.spacing(),
        *metadata.direction(),
    ))
}

/// Geometry from the sform, the qform or pixdim (in that order of
/// preference), in (plane, row, column) axis order.
fn metadata_from_header(header: &NiftiHeader) -> ImageMetadata<3> {
    let affine: [[f32; 4]; 3] = if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z]
    } else if header.qform_code > 0 {
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };

        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;
        [
            [
                (a * a + b * b - c * c - d * d) * dx,
                (2.0 * b * c - 2.0 * a * d) * dy,
                (2.0 * b * d + 2.0 * a * c) * dz,
                header.quatern_x,
            ],
            [
                (2.0 * b * c + 2.0 * a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                (2.0 * c * d - 2.0 * a * b) * dz,
                header.quatern_y,
            ],
            [
                (2.0 * b * d - 2.0 * a * c) * dx,
                (2.0 * c * d + 2.0 * a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                header.quatern_z,
            ],
        ]
    } else {
        [
            [header.pixdim[1], 0.0, 0.0, 0.0],
            [0.0, header.pixdim[2], 0.0, 0.0],
            [0.0, 0.0, header.pixdim[3], 0.0],
        ]
    };

    let origin = Point::new([affine[0][3] as f64, affine[1][3] as f64, affine[2][3] as f64]);
    let fallback = [Vector3::x(), Vector3::y(), Vector3::z()];
    let mut spacing = [1.0; 3];
    let mut columns = fallback;
    for j in 0..3 {
        let col = Vector3::new(affine[0][j] as f64, affine[1][j] as f64, affine[2][j] as f64);
        let norm = col.norm();
        if norm > 1e-9 {
            spacing[j] = norm;
            columns[j] = col / norm;
        }
    }

    // Tensor axis 0 is NIfTI k (z), axis 2 is NIfTI i (x).
    let direction = Direction(SMatrix::<f64, 3, 3>::from_columns(&[columns[2], columns[1], columns[0]]));
    if !direction.is_orthogonal() {
        warn!(direction = ?direction.inner(), "NIfTI affine is sheared; physical mapping keeps the shear");
    }
    ImageMetadata::new(origin, Spacing::new([spacing[2], spacing[1], spacing[0]]), direction)
}

fn header_from_metadata(metadata: &ImageMetadata<3>) -> NiftiHeader {
    let spacing = metadata.spacing();
    let direction = metadata.direction();
    let origin = metadata.origin();

    let mut header = NiftiHeader::default();
    header.pixdim = [1.0; 8];
    // NIfTI axis j is tensor axis 2 - j.
    let mut rows = [[0.0f32; 4]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().take(3).enumerate() {
            let axis = 2 - j;
            *value = (direction[(r, axis)] * spacing[axis]) as f32;
        }
        row[3] = origin[r] as f32;
    }
    for j in 0..3 {
        header.pixdim[j + 1] = spacing[2 - j] as f32;
    }
    header.srow_x = rows[0];
    header.srow_y = rows[1];
    header.srow_z = rows[2];
    header.sform_code = 1;
    header.qform_code = 0;
    header
}

/// Write an image to a NIfTI file, keeping origin, spacing and direction in
/// the sform.
pub fn write_nifti<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    use ndarray::Array3;
    use nifti::writer::WriterOptions;

    let path = path.as_ref();
    let [nz, ny, nx] = image.shape();
    let tensor = image.data().clone().permute([2, 1, 0]);
    let values = tensor
        .to_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Failed to get tensor data: {:?}", e))?;

    let array = Array3::from_shape_vec((nx, ny, nz), values).context("Failed to create ndarray")?;
    let header = header_from_metadata(&image.metadata());

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;
    info!(path = %path.display(), shape = ?[nz, ny, nx], "wrote NIfTI");
    Ok(())
}

/// Write a label map as a float NIfTI volume.
pub fn write_labels_nifti<B: Backend, P: AsRef<Path>>(path: P, labels: &LabelMap, device: &B::Device) -> Result<()> {
    let image = labels.to_image::<B>(device).context("Failed to convert label map")?;
    write_nifti(path, &image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use nifti::writer::WriterOptions;
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_read_nifti_basic() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.nii");

        // x = 3, y = 4, z = 5
        let data: Vec<f32> = (0..3 * 4 * 5).map(|x| x as f32).collect();
        let array = ndarray::Array3::from_shape_vec((3, 4, 5), data)?;
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let device = Default::default();
        let image = read_nifti::<TestBackend, _>(&file_path, &device)?;
        assert_eq!(image.shape(), [5, 4, 3]);

        let values = image.to_vec()?;
        assert_eq!(values.len(), 60);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[59], 59.0);
        // Tensor [z=1, y=0, x=0] is array[0, 0, 1].
        assert_eq!(values[12], 1.0);
        Ok(())
    }

    #[test]
    fn test_header_geometry_roundtrip() {
        let metadata = ImageMetadata::new(
            Point::new([5.0, -3.0, 12.5]),
            Spacing::new([2.0, 0.5, 0.25]),
            Direction::identity(),
        );
        let recovered = metadata_from_header(&header_from_metadata(&metadata));
        assert_eq!(recovered.spacing().to_array(), [2.0, 0.5, 0.25]);
        assert_eq!(recovered.origin().to_array(), [5.0, -3.0, 12.5]);
        assert_eq!(recovered.direction(), &Direction::identity());
    }

    #[test]
    fn test_rejects_time_series() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("series.nii");
        let array = ndarray::Array4::<f32>::zeros((2, 2, 2, 3));
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let device = Default::default();
        let err = read_nifti::<TestBackend, _>(&file_path, &device).unwrap_err();
        match err.downcast_ref::<VolumeError>() {
            Some(VolumeError::UnsupportedDimension { expected, actual }) => {
                assert_eq!((*expected, *actual), (3, 4));
            }
            other => panic!("unexpected error {:?}", other),
        }
        Ok(())
    }
}
