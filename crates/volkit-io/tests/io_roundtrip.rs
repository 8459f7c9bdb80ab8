use anyhow::Result;
use burn_ndarray::NdArray;
use tempfile::tempdir;
use volkit_core::image::{Image, ImageMetadata, LabelMap};
use volkit_core::measure::marching_cubes;
use volkit_core::spatial::{Direction, Point, Spacing};
use volkit_io::{read_volume, render_plane, write_labels_nifti, write_obj, write_volume};

type TestBackend = NdArray<f32>;

fn sample(metadata: &ImageMetadata<3>) -> Image<TestBackend, 3> {
    let device = Default::default();
    let values = (0..4 * 5 * 6).map(|v| (v % 17) as f32).collect();
    Image::from_vec([4, 5, 6], values, metadata, &device).unwrap()
}

#[test]
fn test_nifti_roundtrip_keeps_geometry() -> Result<()> {
    let dir = tempdir()?;
    let metadata = ImageMetadata::new(
        Point::new([1.0, 2.0, 3.0]),
        Spacing::new([2.0, 0.5, 0.25]),
        Direction::identity(),
    );
    let image = sample(&metadata);

    for name in ["volume.nii", "volume.nii.gz"] {
        let path = dir.path().join(name);
        write_volume(&path, &image)?;
        let device = Default::default();
        let read = read_volume::<TestBackend, _>(&path, None, &device)?;
        assert_eq!(read.shape(), [4, 5, 6]);
        assert_eq!(read.to_vec()?, image.to_vec()?);
        assert_eq!(read.spacing().to_array(), [2.0, 0.5, 0.25]);
        assert_eq!(read.origin().to_array(), [1.0, 2.0, 3.0]);
    }
    Ok(())
}

#[test]
fn test_spacing_override_and_tiff() -> Result<()> {
    let dir = tempdir()?;
    let image = sample(&ImageMetadata::default());
    let path = dir.path().join("stack.tiff");
    write_volume(&path, &image)?;

    let device = Default::default();
    let spacing = Spacing::new([3.0, 1.0, 1.0]);
    let read = read_volume::<TestBackend, _>(&path, Some(spacing), &device)?;
    assert_eq!(read.spacing(), &spacing);
    assert_eq!(read.to_vec()?, image.to_vec()?);

    assert!(read_volume::<TestBackend, _>(dir.path().join("missing.nii"), None, &device).is_err());
    assert!(read_volume::<TestBackend, _>(dir.path().join("volume.raw"), None, &device).is_err());
    Ok(())
}

#[test]
fn test_label_map_and_mesh_outputs() -> Result<()> {
    let dir = tempdir()?;
    let device = Default::default();
    let mut labels = LabelMap::zeros([3, 3, 3], ImageMetadata::default());
    labels.set([1, 1, 1], 5);

    let path = dir.path().join("labels.nii.gz");
    write_labels_nifti::<TestBackend, _>(&path, &labels, &device)?;
    let read = read_volume::<TestBackend, _>(&path, None, &device)?;
    assert_eq!(read.statistics()?.max, 5.0);

    let mesh = marching_cubes(&read, 2.5)?;
    let obj = dir.path().join("labels.obj");
    write_obj(&obj, &mesh)?;
    let text = std::fs::read_to_string(&obj)?;
    assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), mesh.vertices.len());
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), mesh.faces.len());
    Ok(())
}

#[test]
fn test_render_volume_reports_dimension_error() {
    let image = sample(&ImageMetadata::default());
    let err = render_plane(&image, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported dimensions: expected a 2D image, got 3D"
    );
}
