//! Index arithmetic for host-side 3D buffers.
//!
//! Voxels are stored row-major in (plane, row, column) order, the same order
//! burn uses for a `[planes, rows, columns]` tensor, so a buffer obtained
//! from [`Image::to_vec`](crate::Image::to_vec) can be walked with a [`Grid`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, VolumeError};

/// Shape and strides of a 3D volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    shape: [usize; 3],
    strides: [usize; 3],
}

impl Grid {
    pub fn new(shape: [usize; 3]) -> Self {
        Self {
            shape,
            strides: [shape[1] * shape[2], shape[2], 1],
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn strides(&self) -> [usize; 3] {
        self.strides
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, coords: [usize; 3]) -> usize {
        coords[0] * self.strides[0] + coords[1] * self.strides[1] + coords[2]
    }

    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let plane = index / self.strides[0];
        let rem = index % self.strides[0];
        [plane, rem / self.strides[1], rem % self.strides[1]]
    }

    /// Neighbour at `coords + delta`, or `None` outside the volume.
    #[inline]
    pub fn offset(&self, coords: [usize; 3], delta: [isize; 3]) -> Option<usize> {
        let mut out = [0usize; 3];
        for a in 0..3 {
            let c = coords[a] as isize + delta[a];
            if c < 0 || c >= self.shape[a] as isize {
                return None;
            }
            out[a] = c as usize;
        }
        Some(self.index(out))
    }

    /// Neighbour at `coords + delta` with coordinates clamped to the volume
    /// (nearest-edge boundary).
    #[inline]
    pub fn clamped(&self, coords: [usize; 3], delta: [isize; 3]) -> usize {
        let mut out = [0usize; 3];
        for a in 0..3 {
            let max = self.shape[a] as isize - 1;
            out[a] = (coords[a] as isize + delta[a]).clamp(0, max) as usize;
        }
        self.index(out)
    }

    /// True if the voxel lies on any face of the volume.
    pub fn on_border(&self, coords: [usize; 3]) -> bool {
        (0..3).any(|a| coords[a] == 0 || coords[a] + 1 == self.shape[a])
    }

    /// Fail with `ShapeMismatch` unless `other` covers the same grid.
    pub fn ensure_same(&self, other: [usize; 3]) -> Result<()> {
        if self.shape != other {
            return Err(VolumeError::shape_mismatch(&self.shape, &other));
        }
        Ok(())
    }
}

/// Neighbourhood used when two voxels count as touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Shared face: 6 neighbours.
    Face,
    /// Shared face or edge: 18 neighbours.
    Edge,
    /// Any shared corner: 26 neighbours.
    Vertex,
}

impl Connectivity {
    /// Map the usual 1..=3 rank (maximum number of orthogonal steps).
    pub fn from_rank(rank: u8) -> Result<Self> {
        match rank {
            1 => Ok(Self::Face),
            2 => Ok(Self::Edge),
            3 => Ok(Self::Vertex),
            _ => Err(VolumeError::invalid_parameter(format!(
                "connectivity rank must be 1, 2 or 3, got {}",
                rank
            ))),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Self::Face => 1,
            Self::Edge => 2,
            Self::Vertex => 3,
        }
    }

    /// Neighbour offsets, centre excluded, in raster order.
    pub fn offsets(&self) -> Vec<[isize; 3]> {
        let rank = self.rank();
        let mut out = Vec::with_capacity(26);
        for dz in -1isize..=1 {
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let steps = (dz != 0) as usize + (dy != 0) as usize + (dx != 0) as usize;
                    if steps > 0 && steps <= rank {
                        out.push([dz, dy, dx]);
                    }
                }
            }
        }
        out
    }
}
