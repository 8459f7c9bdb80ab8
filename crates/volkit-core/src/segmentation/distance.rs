//! Exact Euclidean distance transform.

use burn::tensor::backend::Backend;
use tracing::debug;

use crate::error::Result;
use crate::image::{Grid, Image, Mask};

/// Squared distance given to foreground voxels before any background has
/// been seen. Large enough to never win, small enough to keep the envelope
/// intersections finite.
const FAR: f64 = 1e20;

/// Distance from every foreground voxel to the nearest background voxel, in
/// physical units. Background voxels are 0.
///
/// Uses the separable lower-envelope algorithm of Felzenszwalb and
/// Huttenlocher, one pass per axis weighted by that axis' spacing. A mask
/// without background yields very large distances.
pub fn distance_transform_edt<B: Backend>(mask: &Mask, device: &B::Device) -> Result<Image<B, 3>> {
    let values = squared_edt(mask).into_iter().map(|d| d.sqrt() as f32).collect();
    Image::from_vec(mask.shape(), values, mask.metadata(), device)
}

pub(crate) fn squared_edt(mask: &Mask) -> Vec<f64> {
    let grid = *mask.grid();
    let spacing = *mask.metadata().spacing();
    let mut dist: Vec<f64> = mask.as_slice().iter().map(|&fg| if fg { FAR } else { 0.0 }).collect();
    if grid.is_empty() {
        return dist;
    }

    let shape = grid.shape();
    let strides = grid.strides();
    for axis in 0..3 {
        let n = shape[axis];
        if n < 2 {
            continue;
        }
        let w2 = spacing[axis] * spacing[axis];
        let stride = strides[axis];
        let mut line = vec![0.0; n];
        let mut out = vec![0.0; n];
        let mut v = vec![0usize; n];
        let mut z = vec![0.0; n + 1];

        for start in line_starts(&grid, axis) {
            for i in 0..n {
                line[i] = dist[start + i * stride];
            }
            lower_envelope(&line, w2, &mut out, &mut v, &mut z);
            for i in 0..n {
                dist[start + i * stride] = out[i];
            }
        }
        debug!(axis, "edt pass");
    }
    dist
}

/// First voxel index of every line running along `axis`.
fn line_starts(grid: &Grid, axis: usize) -> Vec<usize> {
    let shape = grid.shape();
    let mut starts = Vec::with_capacity(grid.len() / shape[axis].max(1));
    for z in 0..if axis == 0 { 1 } else { shape[0] } {
        for y in 0..if axis == 1 { 1 } else { shape[1] } {
            for x in 0..if axis == 2 { 1 } else { shape[2] } {
                starts.push(grid.index([z, y, x]));
            }
        }
    }
    starts
}

/// `out[p] = min_q w2 * (p - q)^2 + f[q]`.
fn lower_envelope(f: &[f64], w2: f64, out: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    let parabola = |q: usize| f[q] + w2 * (q * q) as f64;
    let intersect = |q: usize, p: usize| (parabola(q) - parabola(p)) / (2.0 * w2 * (q - p) as f64);

    let mut k = 0;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;
    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, slot) in out.iter_mut().enumerate().take(n) {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let d = q as f64 - v[k] as f64;
        *slot = w2 * d * d + f[v[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageMetadata;
    use crate::spatial::Spacing;

    fn brute_force(mask: &Mask) -> Vec<f64> {
        let grid = *mask.grid();
        let spacing = *mask.metadata().spacing();
        (0..grid.len())
            .map(|i| {
                if !mask.as_slice()[i] {
                    return 0.0;
                }
                let a = grid.coords(i);
                (0..grid.len())
                    .filter(|&j| !mask.as_slice()[j])
                    .map(|j| {
                        let b = grid.coords(j);
                        (0..3)
                            .map(|k| {
                                let d = (a[k] as f64 - b[k] as f64) * spacing[k];
                                d * d
                            })
                            .sum::<f64>()
                    })
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    #[test]
    fn test_matches_brute_force() {
        let meta = ImageMetadata::with_spacing(Spacing::new([2.0, 1.0, 0.5]));
        let mut mask = Mask::filled([5, 6, 7], true, meta);
        mask.set([0, 0, 0], false);
        mask.set([4, 2, 6], false);
        mask.set([2, 5, 3], false);
        let fast = squared_edt(&mask);
        let slow = brute_force(&mask);
        for (a, b) in fast.iter().zip(&slow) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_line_distances() {
        let mut mask = Mask::filled([1, 1, 7], true, ImageMetadata::default());
        mask.set([0, 0, 0], false);
        mask.set([0, 0, 6], false);
        let d = squared_edt(&mask);
        assert_eq!(d, vec![0.0, 1.0, 4.0, 9.0, 4.0, 1.0, 0.0]);
    }

    #[test]
    fn test_no_background_is_far() {
        let mask = Mask::filled([2, 2, 2], true, ImageMetadata::default());
        assert!(squared_edt(&mask).iter().all(|&d| d >= FAR));
    }
}
