//! Points in physical space.

use nalgebra::Point as NaPoint;
use super::Vector;

/// A position in D-dimensional physical space (image origins, centroids).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// The point with all coordinates zero.
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Build a point from a slice.
    ///
    /// # Panics
    /// Panics if `coords.len() != D`.
    pub fn from_slice(coords: &[f64]) -> Self {
        assert!(coords.len() == D, "Coordinate slice length must match dimension");
        let mut point = Self::origin();
        for (i, &c) in coords.iter().enumerate() {
            point.0.coords[i] = c;
        }
        point
    }

    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.0.coords[i];
        }
        out
    }

    pub fn inner(&self) -> &NaPoint<f64, D> {
        &self.0
    }
}

impl Point<3> {
    /// Drop one coordinate, e.g. to place the origin of an extracted plane.
    pub fn drop_axis(&self, axis: usize) -> Point<2> {
        let kept: Vec<f64> = (0..3).filter(|&a| a != axis).map(|a| self[a]).collect();
        Point::<2>::from_slice(&kept)
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0.coords[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0.coords - other.0.coords)
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 + vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Point3 = Point<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_point_from_slice_and_array() {
        let p = Point3::from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(p.to_array(), [1.0, 2.0, 3.0]);
        assert_eq!(Point3::origin().to_array(), [0.0; 3]);
    }

    #[test]
    fn test_point_arithmetic() {
        let p1 = Point3::new([5.0, 5.0, 5.0]);
        let p2 = Point3::new([2.0, 3.0, 4.0]);
        assert_eq!(p1 - p2, Vector3::new([3.0, 2.0, 1.0]));
        assert_eq!(p2 + Vector3::new([1.0, 1.0, 1.0]), Point3::new([3.0, 4.0, 5.0]));
    }

    #[test]
    fn test_drop_axis() {
        let p = Point3::new([10.0, 20.0, 30.0]);
        assert_eq!(p.drop_axis(0).to_array(), [20.0, 30.0]);
        assert_eq!(p.drop_axis(1).to_array(), [10.0, 30.0]);
    }
}
