//! Per-label measurements.

use burn::tensor::backend::Backend;
use nalgebra::{Matrix3, SymmetricEigen};
use serde::Serialize;

use crate::error::Result;
use crate::image::{Image, LabelMap};
use crate::spatial::Point;

/// Intensity summary of one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntensityStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Measurements of one labeled region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProperties {
    pub label: u32,
    /// Voxel count.
    pub area: usize,
    /// Physical volume (`area * voxel volume`).
    pub volume: f64,
    /// Inclusive lower corner of the bounding box.
    pub bbox_min: [usize; 3],
    /// Exclusive upper corner of the bounding box.
    pub bbox_max: [usize; 3],
    /// Mean voxel index.
    pub centroid: [f64; 3],
    /// Centroid mapped through origin, spacing and direction.
    pub physical_centroid: [f64; 3],
    /// Diameter of the sphere with the same physical volume.
    pub equivalent_diameter: f64,
    /// Fraction of the bounding box occupied by the region.
    pub extent: f64,
    pub major_axis_length: f64,
    pub minor_axis_length: f64,
    pub intensity: Option<IntensityStats>,
}

#[derive(Default, Clone)]
struct Accumulator {
    count: usize,
    lo: [usize; 3],
    hi: [usize; 3],
    sum: [f64; 3],
    sum_sq: [[f64; 3]; 3],
    i_sum: f64,
    i_min: f64,
    i_max: f64,
}

impl Accumulator {
    fn add(&mut self, c: [usize; 3], intensity: Option<f32>) {
        if self.count == 0 {
            self.lo = c;
            self.hi = c;
            self.i_min = f64::INFINITY;
            self.i_max = f64::NEG_INFINITY;
        }
        self.count += 1;
        for a in 0..3 {
            self.lo[a] = self.lo[a].min(c[a]);
            self.hi[a] = self.hi[a].max(c[a]);
            self.sum[a] += c[a] as f64;
            for b in 0..3 {
                self.sum_sq[a][b] += (c[a] * c[b]) as f64;
            }
        }
        if let Some(v) = intensity {
            let v = v as f64;
            self.i_sum += v;
            self.i_min = self.i_min.min(v);
            self.i_max = self.i_max.max(v);
        }
    }
}

/// Measure every label present in `labels`, in ascending label order.
///
/// When `intensity` is given it must share the label map's shape and the
/// per-region mean, minimum and maximum are filled in.
pub fn regionprops<B: Backend>(labels: &LabelMap, intensity: Option<&Image<B, 3>>) -> Result<Vec<RegionProperties>> {
    let grid = *labels.grid();
    let values = match intensity {
        Some(image) => {
            grid.ensure_same(image.shape())?;
            Some(image.to_vec()?)
        }
        None => None,
    };

    let mut acc = vec![Accumulator::default(); labels.max_label() as usize + 1];
    for (idx, &l) in labels.as_slice().iter().enumerate() {
        if l != 0 {
            acc[l as usize].add(grid.coords(idx), values.as_ref().map(|v| v[idx]));
        }
    }

    let metadata = labels.metadata();
    let spacing = *metadata.spacing();
    let voxel_volume = spacing.voxel_volume();

    let props = acc
        .iter()
        .enumerate()
        .filter(|(_, a)| a.count > 0)
        .map(|(label, a)| {
            let n = a.count as f64;
            let centroid = [a.sum[0] / n, a.sum[1] / n, a.sum[2] / n];
            let physical_centroid = metadata.index_to_physical_point(&Point::new(centroid)).to_array();
            let volume = n * voxel_volume;
            let bbox_max = [a.hi[0] + 1, a.hi[1] + 1, a.hi[2] + 1];
            let bbox_voxels: usize = (0..3).map(|k| bbox_max[k] - a.lo[k]).product();

            let covariance = Matrix3::from_fn(|i, j| {
                (a.sum_sq[i][j] / n - centroid[i] * centroid[j]) * spacing[i] * spacing[j]
            });
            let (major_axis_length, minor_axis_length) = axis_lengths(&covariance);

            RegionProperties {
                label: label as u32,
                area: a.count,
                volume,
                bbox_min: a.lo,
                bbox_max,
                centroid,
                physical_centroid,
                equivalent_diameter: (6.0 * volume / std::f64::consts::PI).cbrt(),
                extent: n / bbox_voxels as f64,
                major_axis_length,
                minor_axis_length,
                intensity: values.as_ref().map(|_| IntensityStats {
                    mean: a.i_sum / n,
                    min: a.i_min,
                    max: a.i_max,
                }),
            }
        })
        .collect();
    Ok(props)
}

/// Major and minor axis lengths of the ellipsoid with the same second
/// moments, from the eigenvalues of the inertia tensor `tr(C) I - C`.
fn axis_lengths(covariance: &Matrix3<f64>) -> (f64, f64) {
    let inertia = Matrix3::identity() * covariance.trace() - covariance;
    let mut ev: Vec<f64> = SymmetricEigen::new(inertia).eigenvalues.iter().copied().collect();
    ev.sort_by(|a, b| b.total_cmp(a));
    let major = (10.0 * (ev[0] + ev[1] - ev[2])).max(0.0).sqrt();
    let minor = (10.0 * (-ev[0] + ev[1] + ev[2])).max(0.0).sqrt();
    (major, minor)
}
