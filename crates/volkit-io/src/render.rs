//! Static previews: grayscale planes, montages and label overlays.

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use std::path::Path;
use tracing::info;
use volkit_core::error::VolumeError;
use volkit_core::image::{Image, LabelMap};

/// Render a 2D image as 8-bit grayscale, mapping `window` (default: the
/// image range) linearly onto `0..=255`.
///
/// Volumes are rejected with [`VolumeError::UnsupportedDimension`]; take a
/// plane first with [`Image::plane`].
pub fn render_plane<B: Backend, const D: usize>(
    image: &Image<B, D>,
    window: Option<(f64, f64)>,
) -> volkit_core::Result<GrayImage> {
    if D != 2 {
        return Err(VolumeError::UnsupportedDimension {
            expected: 2,
            actual: D,
        });
    }
    let shape = image.shape();
    let (rows, cols) = (shape[0], shape[1]);
    let (low, high) = match window {
        Some(w) => w,
        None => {
            let stats = image.statistics()?;
            (stats.min, stats.max)
        }
    };
    let values = image.to_vec()?;
    let pixels = values.iter().map(|&v| to_gray(v as f64, low, high)).collect();
    GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| VolumeError::data_conversion("plane does not fit an 8-bit image buffer"))
}

fn to_gray(v: f64, low: f64, high: f64) -> u8 {
    if high - low <= f64::EPSILON {
        return 0;
    }
    (((v - low) / (high - low)).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Tile every `step`-th plane along axis 0 into a grid `columns` wide, with a
/// shared intensity window.
pub fn montage<B: Backend>(volume: &Image<B, 3>, columns: usize, step: usize) -> volkit_core::Result<GrayImage> {
    if columns == 0 || step == 0 {
        return Err(VolumeError::invalid_parameter("montage columns and step must be positive"));
    }
    let [planes, rows, cols] = volume.shape();
    let stats = volume.statistics()?;
    let window = Some((stats.min, stats.max));

    let indices: Vec<usize> = (0..planes).step_by(step).collect();
    let grid_rows = indices.len().div_ceil(columns);
    let grid_cols = columns.min(indices.len());
    let mut canvas = GrayImage::new((grid_cols * cols) as u32, (grid_rows * rows) as u32);

    for (tile, &index) in indices.iter().enumerate() {
        let plane = render_plane(&volume.plane(0, index)?, window)?;
        let x0 = ((tile % columns) * cols) as i64;
        let y0 = ((tile / columns) * rows) as i64;
        image::imageops::replace(&mut canvas, &plane, x0, y0);
    }
    Ok(canvas)
}

/// Colour of `label` in overlays; background is never coloured.
pub fn label_color(label: u32) -> [u8; 3] {
    // Golden-ratio hue steps.
    let hue = (label as f64 * 0.618_033_988_749_895).fract();
    hsv_to_rgb(hue, 0.75, 1.0)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [u8; 3] {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    let (r, g, b) = match i as i64 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [r, g, b].map(|c| (c * 255.0).round() as u8)
}

/// Labels of plane `index` along axis 0, row-major.
pub fn labels_in_plane(labels: &LabelMap, index: usize) -> volkit_core::Result<Vec<u32>> {
    let [planes, rows, cols] = labels.shape();
    if index >= planes {
        return Err(VolumeError::invalid_parameter(format!(
            "plane {} out of range, label map has {} planes",
            index, planes
        )));
    }
    let page = rows * cols;
    Ok(labels.as_slice()[index * page..(index + 1) * page].to_vec())
}

/// Blend label colours over a grayscale plane with opacity `alpha`.
pub fn label_overlay<B: Backend>(plane: &Image<B, 2>, labels: &[u32], alpha: f64) -> volkit_core::Result<RgbImage> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(VolumeError::invalid_parameter(format!(
            "overlay alpha must lie in [0, 1], got {}",
            alpha
        )));
    }
    let gray = render_plane(plane, None)?;
    if labels.len() != gray.len() {
        let [rows, cols] = plane.shape();
        return Err(VolumeError::shape_mismatch(&[rows, cols], &[labels.len()]));
    }
    let mut out = RgbImage::new(gray.width(), gray.height());
    for ((pixel, g), &label) in out.pixels_mut().zip(gray.pixels()).zip(labels) {
        let base = g.0[0] as f64;
        *pixel = if label == 0 {
            Rgb([g.0[0]; 3])
        } else {
            let color = label_color(label);
            Rgb(color.map(|c| ((1.0 - alpha) * base + alpha * c as f64).round() as u8))
        };
    }
    Ok(out)
}

/// Save a rendered preview as PNG.
pub fn save_png<P: AsRef<Path>>(path: P, image: impl Into<DynamicImage>) -> Result<()> {
    let path = path.as_ref();
    image
        .into()
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write PNG {}", path.display()))?;
    info!(path = %path.display(), "wrote PNG");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use volkit_core::image::ImageMetadata;

    type TestBackend = NdArray<f32>;

    fn ramp_volume() -> Image<TestBackend, 3> {
        let device = Default::default();
        let values = (0..4 * 2 * 3).map(|v| v as f32).collect();
        Image::from_vec([4, 2, 3], values, &ImageMetadata::default(), &device).unwrap()
    }

    #[test]
    fn test_volume_is_rejected() {
        let err = render_plane(&ramp_volume(), None).unwrap_err();
        assert!(matches!(
            err,
            VolumeError::UnsupportedDimension {
                expected: 2,
                actual: 3
            }
        ));
        assert!(err.to_string().contains("expected a 2D image, got 3D"));
    }

    #[test]
    fn test_plane_window() {
        let plane = ramp_volume().plane(0, 1).unwrap();
        let gray = render_plane(&plane, None).unwrap();
        assert_eq!(gray.dimensions(), (3, 2));
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(2, 1).0[0], 255);

        let clipped = render_plane(&plane, Some((0.0, 100.0))).unwrap();
        assert_eq!(clipped.get_pixel(0, 0).0[0], 15);
    }

    #[test]
    fn test_montage_layout() {
        let canvas = montage(&ramp_volume(), 2, 1).unwrap();
        assert_eq!(canvas.dimensions(), (6, 4));
        let every_other = montage(&ramp_volume(), 3, 2).unwrap();
        assert_eq!(every_other.dimensions(), (6, 2));
        assert!(montage(&ramp_volume(), 0, 1).is_err());
    }

    #[test]
    fn test_overlay_colours_labels_only() {
        let plane = ramp_volume().plane(0, 0).unwrap();
        let labels = vec![0, 1, 0, 0, 2, 0];
        let rgb = label_overlay(&plane, &labels, 1.0).unwrap();
        let p = rgb.get_pixel(0, 0).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(rgb.get_pixel(1, 0).0, label_color(1));
        assert_ne!(label_color(1), label_color(2));
        assert!(label_overlay(&plane, &labels[..3], 0.5).is_err());
    }

    #[test]
    fn test_save_png() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("plane.png");
        let plane = ramp_volume().plane(0, 2).unwrap();
        save_png(&path, render_plane(&plane, None)?)?;
        let loaded = image::open(&path)?;
        assert_eq!((loaded.width(), loaded.height()), (3, 2));
        Ok(())
    }
}
