//! Physical sample spacing.
//!
//! `spacing[i]` is the physical distance between neighbouring samples along
//! tensor axis `i`. For volumes that is (plane, row, column) order.

use super::Vector;
use crate::error::{Result, VolumeError};

/// Spacing between adjacent samples along each axis.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing along every axis.
    pub fn uniform(value: f64) -> Self {
        Self::new([value; D])
    }

    pub fn is_uniform(&self) -> bool {
        (1..D).all(|i| (self[i] - self[0]).abs() < 1e-9)
    }

    pub fn min_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::INFINITY, f64::min)
    }

    pub fn max_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Physical volume (or area) of a single sample.
    pub fn voxel_volume(&self) -> f64 {
        (0..D).map(|i| self[i]).product()
    }

    /// Reject zero, negative or non-finite components.
    pub fn validate(&self) -> Result<()> {
        for i in 0..D {
            if !(self[i].is_finite() && self[i] > 0.0) {
                return Err(VolumeError::invalid_parameter(format!(
                    "spacing along axis {} must be positive and finite, got {}",
                    i, self[i]
                )));
            }
        }
        Ok(())
    }
}

impl Spacing<3> {
    /// Spacing of the plane obtained by removing `axis`.
    pub fn drop_axis_spacing(&self, axis: usize) -> Spacing<2> {
        let kept: Vec<f64> = (0..3).filter(|&a| a != axis).map(|a| self[a]).collect();
        Spacing::<2>::from_slice(&kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        let s = Spacing3::uniform(0.5);
        assert!(s.is_uniform());
        assert_eq!(s.voxel_volume(), 0.125);
        assert!(!Spacing3::new([0.29, 0.26, 0.26]).is_uniform());
    }

    #[test]
    fn test_spacing_min_max() {
        let s = Spacing3::new([1.0, 2.0, 3.0]);
        assert_eq!(s.min_spacing(), 1.0);
        assert_eq!(s.max_spacing(), 3.0);
        assert_eq!(s.voxel_volume(), 6.0);
    }

    #[test]
    fn test_spacing_validate() {
        assert!(Spacing3::new([1.0, 0.5, 0.5]).validate().is_ok());
        assert!(Spacing3::new([1.0, 0.0, 0.5]).validate().is_err());
        assert!(Spacing3::new([1.0, f64::NAN, 0.5]).validate().is_err());
    }

    #[test]
    fn test_drop_axis_spacing() {
        let s = Spacing3::new([2.0, 0.5, 0.25]);
        assert_eq!(s.drop_axis_spacing(0).to_array(), [0.5, 0.25]);
    }
}
