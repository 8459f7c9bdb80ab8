//! Direction type for representing image orientation.
//!
//! Column `i` of a direction matrix is the physical direction of tensor
//! axis `i`.

use nalgebra::SMatrix;
use super::Vector;

/// Direction cosine matrix of an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Identity orientation: tensor axes are aligned with physical axes.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    pub fn zeros() -> Self {
        Self(SMatrix::zeros())
    }

    /// Check if the matrix is orthogonal within `1e-6`.
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        (0..D).all(|i| {
            (0..D).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (product[(i, j)] - expected).abs() < 1e-6
            })
        })
    }

    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }

    pub fn inner_mut(&mut self) -> &mut SMatrix<f64, D, D> {
        &mut self.0
    }
}

impl Direction<3> {
    /// Orientation of a plane obtained by removing tensor axis `axis`.
    ///
    /// The remaining 2x2 block is taken from the rows and columns that are
    /// kept; for an identity direction this is again the identity.
    pub fn drop_axis(&self, axis: usize) -> Direction<2> {
        let keep: Vec<usize> = (0..3).filter(|&a| a != axis).collect();
        let mut out = Direction::<2>::zeros();
        for (r, &kr) in keep.iter().enumerate() {
            for (c, &kc) in keep.iter().enumerate() {
                out.0[(r, c)] = self.0[(kr, kc)];
            }
        }
        out
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<(usize, usize)> for Direction<D> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}
