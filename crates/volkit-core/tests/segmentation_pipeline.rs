use burn_ndarray::NdArray;
use volkit_core::exposure::{rescale_intensity, IntensityRange};
use volkit_core::filter::{GaussianFilter, SobelFilter};
use volkit_core::image::{Connectivity, Image, ImageMetadata};
use volkit_core::measure::{marching_cubes, regionprops};
use volkit_core::morphology::{binary_opening, remove_small_holes, StructuringElement};
use volkit_core::segmentation::{
    distance_transform_edt, label, markers_from_peaks, peak_local_max, watershed, PeakConfig,
};
use volkit_core::spatial::Spacing;
use volkit_core::threshold::{apply_threshold, threshold_otsu};

type Backend = NdArray<f32>;

/// Two overlapping bright balls on a dim background.
fn touching_balls() -> Image<Backend, 3> {
    let device = Default::default();
    let shape = [20, 20, 32];
    let centres = [[10.0, 10.0, 10.0], [10.0, 10.0, 21.0]];
    let mut values = Vec::new();
    for z in 0..shape[0] {
        for y in 0..shape[1] {
            for x in 0..shape[2] {
                let p = [z as f64, y as f64, x as f64];
                let inside = centres.iter().any(|c| {
                    let d2: f64 = (0..3).map(|k| (p[k] - c[k]).powi(2)).sum();
                    d2 <= 36.0
                });
                values.push(if inside { 200.0 } else { 20.0 });
            }
        }
    }
    let meta = ImageMetadata::with_spacing(Spacing::uniform(1.0));
    Image::from_vec(shape, values, &meta, &device).unwrap()
}

#[test]
fn test_splits_touching_objects() {
    let device = Default::default();
    let raw = touching_balls();
    let image = rescale_intensity(&raw, IntensityRange::Image, (0.0, 1.0)).unwrap();
    let smooth = GaussianFilter::isotropic(0.7).apply(&image).unwrap();

    let t = threshold_otsu(&smooth, 256).unwrap();
    let mask = apply_threshold(&smooth, t).unwrap();
    let mask = binary_opening(&mask, &StructuringElement::ball(1)).unwrap();
    let mask = remove_small_holes(&mask, 64, Connectivity::Face).unwrap();

    // Threshold alone merges the balls.
    assert_eq!(label(&mask, Connectivity::Vertex).unwrap().num_labels(), 1);

    let distance = distance_transform_edt::<Backend>(&mask, &device).unwrap();
    let config = PeakConfig::default().with_min_distance(5);
    let peaks = peak_local_max(&distance, &config, Some(&mask)).unwrap();
    assert_eq!(peaks.len(), 2, "{:?}", peaks);

    let markers = markers_from_peaks(mask.shape(), &peaks, *mask.metadata()).unwrap();
    let elevation = distance.with_data(distance.data().clone().neg());
    let labels = watershed(&elevation, &markers, Some(&mask), Connectivity::Vertex).unwrap();
    assert_eq!(labels.num_labels(), 2);
    assert_eq!(labels.foreground(), mask);

    let props = regionprops(&labels, Some(&raw)).unwrap();
    assert_eq!(props.len(), 2);
    let mut xs: Vec<f64> = props.iter().map(|p| p.centroid[2]).collect();
    xs.sort_by(|a, b| a.total_cmp(b));
    assert!((xs[0] - 10.0).abs() < 1.5, "{:?}", xs);
    assert!((xs[1] - 21.0).abs() < 1.5, "{:?}", xs);
    for p in &props {
        assert_eq!(p.intensity.unwrap().max, 200.0);
    }
}

#[test]
fn test_edges_and_surface_of_thresholded_volume() {
    let image = touching_balls();
    let edges = SobelFilter::planewise().magnitude(&image).unwrap();
    let stats = edges.statistics().unwrap();
    assert_eq!(stats.min, 0.0);
    assert!(stats.max > 0.0);

    let mesh = marching_cubes(&image, 110.0).unwrap();
    assert!(!mesh.is_empty());
    assert!(mesh.enclosed_volume() > 0.0);
}
