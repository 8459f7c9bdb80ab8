//! Structuring elements (footprints) for morphology and rank filters.

use crate::error::{Result, VolumeError};

/// A neighbourhood given as offsets from the centre voxel, in
/// (plane, row, column) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<[isize; 3]>,
}

impl StructuringElement {
    /// Digital ball: all offsets with `dz^2 + dy^2 + dx^2 <= radius^2`.
    pub fn ball(radius: usize) -> Self {
        let r = radius as isize;
        Self::from_predicate(r, |dz, dy, dx| dz * dz + dy * dy + dx * dx <= r * r)
    }

    /// Cube of side `width` (odd widths are centred; even widths extend
    /// one voxel further towards negative offsets).
    pub fn cube(width: usize) -> Self {
        let width = width.max(1) as isize;
        let lo = -(width / 2);
        let hi = lo + width - 1;
        let mut offsets = Vec::new();
        for dz in lo..=hi {
            for dy in lo..=hi {
                for dx in lo..=hi {
                    offsets.push([dz, dy, dx]);
                }
            }
        }
        Self { offsets }
    }

    /// Octahedron: all offsets with `|dz| + |dy| + |dx| <= radius`.
    pub fn octahedron(radius: usize) -> Self {
        let r = radius as isize;
        Self::from_predicate(r, |dz, dy, dx| dz.abs() + dy.abs() + dx.abs() <= r)
    }

    /// Footprint from a boolean array of odd shape, centred on its middle voxel.
    pub fn from_footprint(shape: [usize; 3], footprint: &[bool]) -> Result<Self> {
        if shape.iter().any(|&s| s % 2 == 0) {
            return Err(VolumeError::invalid_parameter(format!(
                "footprint shape must be odd along every axis, got {:?}",
                shape
            )));
        }
        if footprint.len() != shape.iter().product::<usize>() {
            return Err(VolumeError::invalid_parameter("footprint length does not match its shape"));
        }
        let centre = [shape[0] / 2, shape[1] / 2, shape[2] / 2];
        let mut offsets = Vec::new();
        for z in 0..shape[0] {
            for y in 0..shape[1] {
                for x in 0..shape[2] {
                    if footprint[(z * shape[1] + y) * shape[2] + x] {
                        offsets.push([
                            z as isize - centre[0] as isize,
                            y as isize - centre[1] as isize,
                            x as isize - centre[2] as isize,
                        ]);
                    }
                }
            }
        }
        if offsets.is_empty() {
            return Err(VolumeError::invalid_parameter("footprint has no active voxels"));
        }
        Ok(Self { offsets })
    }

    fn from_predicate(r: isize, keep: impl Fn(isize, isize, isize) -> bool) -> Self {
        let mut offsets = Vec::new();
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    if keep(dz, dy, dx) {
                        offsets.push([dz, dy, dx]);
                    }
                }
            }
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[[isize; 3]] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Point reflection through the centre.
    pub fn reflected(&self) -> Self {
        Self {
            offsets: self.offsets.iter().map(|o| [-o[0], -o[1], -o[2]]).collect(),
        }
    }
}
