//! Local maxima detection and marker seeding.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::image::{Grid, Image, ImageMetadata, LabelMap, Mask};

/// Parameters for [`peak_local_max`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Half-width of the maximum filter window and the minimum Chebyshev
    /// separation (exclusive) between accepted peaks.
    pub min_distance: usize,
    /// Absolute intensity floor; defaults to the image minimum.
    pub threshold_abs: Option<f64>,
    /// Floor as a fraction of the image maximum.
    pub threshold_rel: Option<f64>,
    /// Drop peaks closer than `min_distance` to any face.
    pub exclude_border: bool,
    /// Keep at most this many peaks.
    pub num_peaks: Option<usize>,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            min_distance: 1,
            threshold_abs: None,
            threshold_rel: None,
            exclude_border: true,
            num_peaks: None,
        }
    }
}

impl PeakConfig {
    pub fn with_min_distance(mut self, min_distance: usize) -> Self {
        self.min_distance = min_distance;
        self
    }

    pub fn with_threshold_abs(mut self, threshold: f64) -> Self {
        self.threshold_abs = Some(threshold);
        self
    }

    pub fn with_threshold_rel(mut self, threshold: f64) -> Self {
        self.threshold_rel = Some(threshold);
        self
    }

    pub fn with_exclude_border(mut self, exclude: bool) -> Self {
        self.exclude_border = exclude;
        self
    }

    pub fn with_num_peaks(mut self, num_peaks: usize) -> Self {
        self.num_peaks = Some(num_peaks);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub coords: [usize; 3],
    pub value: f32,
}

/// Local maxima of `image`, strongest first.
///
/// A voxel is a candidate if it equals the maximum of its
/// `(2 * min_distance + 1)^3` neighbourhood (edges replicated) and exceeds
/// `max(threshold_abs, threshold_rel * max)`. Candidates are then accepted
/// greedily in decreasing intensity, skipping any within `min_distance` of an
/// accepted peak. A constant image has no peaks.
pub fn peak_local_max<B: Backend>(image: &Image<B, 3>, config: &PeakConfig, mask: Option<&Mask>) -> Result<Vec<Peak>> {
    let grid = Grid::new(image.shape());
    if let Some(mask) = mask {
        grid.ensure_same(mask.shape())?;
    }
    if let Some(rel) = config.threshold_rel {
        if !(0.0..=1.0).contains(&rel) {
            return Err(VolumeError::invalid_parameter(format!(
                "threshold_rel must lie in [0, 1], got {}",
                rel
            )));
        }
    }
    let values = image.to_vec()?;
    if grid.is_empty() {
        return Ok(Vec::new());
    }

    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(max > min) {
        return Ok(Vec::new());
    }

    let mut threshold = config.threshold_abs.unwrap_or(min as f64);
    if let Some(rel) = config.threshold_rel {
        threshold = threshold.max(rel * max as f64);
    }

    let filtered = max_filter(&values, &grid, config.min_distance);
    let border = if config.exclude_border { config.min_distance } else { 0 };
    let shape = grid.shape();

    let mut candidates: Vec<Peak> = (0..grid.len())
        .filter(|&i| {
            let v = values[i];
            v == filtered[i] && v as f64 > threshold && mask.map_or(true, |m| m.as_slice()[i])
        })
        .map(|i| Peak {
            coords: grid.coords(i),
            value: values[i],
        })
        .filter(|p| (0..3).all(|a| p.coords[a] >= border && p.coords[a] + border < shape[a]))
        .collect();
    // Stable: equal intensities keep raster order.
    candidates.sort_by(|a, b| b.value.total_cmp(&a.value));

    let mut peaks: Vec<Peak> = Vec::new();
    for candidate in candidates {
        let crowded = peaks
            .iter()
            .any(|p| chebyshev(p.coords, candidate.coords) <= config.min_distance);
        if !crowded {
            peaks.push(candidate);
            if config.num_peaks.is_some_and(|n| peaks.len() >= n) {
                break;
            }
        }
    }
    debug!(peaks = peaks.len(), threshold, "peak_local_max");
    Ok(peaks)
}

/// Label map with label `i + 1` at the position of `peaks[i]`.
pub fn markers_from_peaks(shape: [usize; 3], peaks: &[Peak], metadata: ImageMetadata<3>) -> Result<LabelMap> {
    let mut markers = LabelMap::zeros(shape, metadata);
    for (i, peak) in peaks.iter().enumerate() {
        if (0..3).any(|a| peak.coords[a] >= shape[a]) {
            return Err(VolumeError::invalid_parameter(format!(
                "peak {:?} lies outside shape {:?}",
                peak.coords, shape
            )));
        }
        let label = u32::try_from(i + 1).map_err(|_| VolumeError::data_conversion("too many peaks for u32 labels"))?;
        markers.set(peak.coords, label);
    }
    Ok(markers)
}

fn chebyshev(a: [usize; 3], b: [usize; 3]) -> usize {
    (0..3).map(|k| a[k].abs_diff(b[k])).max().unwrap_or(0)
}

/// Separable maximum filter with window `2 * radius + 1` and nearest-edge
/// boundary.
fn max_filter(values: &[f32], grid: &Grid, radius: usize) -> Vec<f32> {
    let mut current = values.to_vec();
    if radius == 0 {
        return current;
    }
    let shape = grid.shape();
    let strides = grid.strides();
    for axis in 0..3 {
        let n = shape[axis];
        let stride = strides[axis];
        let mut next = current.clone();
        for idx in 0..grid.len() {
            let c = grid.coords(idx)[axis];
            let lo = c.saturating_sub(radius);
            let hi = (c + radius).min(n - 1);
            let base = idx - c * stride;
            let mut m = f32::NEG_INFINITY;
            for k in lo..=hi {
                m = m.max(current[base + k * stride]);
            }
            next[idx] = m;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn volume(shape: [usize; 3], f: impl Fn(usize, usize, usize) -> f32) -> Image<Backend, 3> {
        let device = Default::default();
        let mut values = Vec::new();
        for z in 0..shape[0] {
            for y in 0..shape[1] {
                for x in 0..shape[2] {
                    values.push(f(z, y, x));
                }
            }
        }
        Image::from_vec(shape, values, &ImageMetadata::default(), &device).unwrap()
    }

    fn two_bumps() -> Image<Backend, 3> {
        volume([7, 7, 15], |z, y, x| {
            let d1 = (z as f32 - 3.0).powi(2) + (y as f32 - 3.0).powi(2) + (x as f32 - 3.0).powi(2);
            let d2 = (z as f32 - 3.0).powi(2) + (y as f32 - 3.0).powi(2) + (x as f32 - 11.0).powi(2);
            (10.0 - d1).max(8.0 - d2).max(0.0)
        })
    }

    #[test]
    fn test_finds_two_bumps_strongest_first() {
        let peaks = peak_local_max(&two_bumps(), &PeakConfig::default(), None).unwrap();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].coords, [3, 3, 3]);
        assert_eq!(peaks[1].coords, [3, 3, 11]);
        assert_eq!(peaks[0].value, 10.0);
    }

    #[test]
    fn test_thresholds_and_cap() {
        let image = two_bumps();
        let rel = PeakConfig::default().with_threshold_rel(0.9);
        assert_eq!(peak_local_max(&image, &rel, None).unwrap().len(), 1);
        let abs = PeakConfig::default().with_threshold_abs(9.0);
        assert_eq!(peak_local_max(&image, &abs, None).unwrap().len(), 1);
        let capped = PeakConfig::default().with_num_peaks(1);
        assert_eq!(peak_local_max(&image, &capped, None).unwrap().len(), 1);
    }

    #[test]
    fn test_min_distance_suppresses_neighbours() {
        let image = two_bumps();
        let far = PeakConfig::default().with_min_distance(8).with_exclude_border(false);
        let peaks = peak_local_max(&image, &far, None).unwrap();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].coords, [3, 3, 3]);
    }

    #[test]
    fn test_plateau_yields_single_peak() {
        let image = volume([5, 5, 5], |z, y, x| if (1..4).contains(&z) && (1..4).contains(&y) && x == 2 { 1.0 } else { 0.0 });
        let peaks = peak_local_max(&image, &PeakConfig::default().with_min_distance(2).with_exclude_border(false), None).unwrap();
        assert_eq!(peaks.len(), 1);
    }

    #[test]
    fn test_border_and_mask() {
        let image = volume([5, 5, 5], |z, y, x| if [z, y, x] == [0, 2, 2] { 1.0 } else { 0.0 });
        assert!(peak_local_max(&image, &PeakConfig::default(), None).unwrap().is_empty());
        let keep_border = PeakConfig::default().with_exclude_border(false);
        assert_eq!(peak_local_max(&image, &keep_border, None).unwrap().len(), 1);

        let mask = Mask::filled([5, 5, 5], false, ImageMetadata::default());
        assert!(peak_local_max(&image, &keep_border, Some(&mask)).unwrap().is_empty());
    }

    #[test]
    fn test_constant_image_has_no_peaks() {
        let image = volume([3, 3, 3], |_, _, _| 2.0);
        assert!(peak_local_max(&image, &PeakConfig::default(), None).unwrap().is_empty());
    }

    #[test]
    fn test_markers_from_peaks() {
        let peaks = [
            Peak { coords: [0, 1, 2], value: 3.0 },
            Peak { coords: [1, 0, 0], value: 1.0 },
        ];
        let markers = markers_from_peaks([2, 2, 3], &peaks, ImageMetadata::default()).unwrap();
        assert_eq!(markers.get([0, 1, 2]), 1);
        assert_eq!(markers.get([1, 0, 0]), 2);
        assert_eq!(markers.num_labels(), 2);
        let outside = [Peak { coords: [2, 0, 0], value: 0.0 }];
        assert!(markers_from_peaks([2, 2, 3], &outside, ImageMetadata::default()).is_err());
    }
}
