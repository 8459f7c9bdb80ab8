//! Geometry shared by images, masks and label maps.

use crate::spatial::{Direction, Point, Spacing, Vector};

/// Origin, spacing and direction of a sampled grid.
///
/// Masks and label maps carry a copy so that measurements on them can be
/// reported in physical units without going back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMetadata<const D: usize> {
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
}

impl<const D: usize> ImageMetadata<D> {
    pub fn new(origin: Point<D>, spacing: Spacing<D>, direction: Direction<D>) -> Self {
        Self {
            origin,
            spacing,
            direction,
        }
    }

    /// The given spacing at the origin with identity direction.
    pub fn with_spacing(spacing: Spacing<D>) -> Self {
        Self::new(Point::origin(), spacing, Direction::identity())
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    pub fn set_spacing(&mut self, spacing: Spacing<D>) {
        self.spacing = spacing;
    }

    /// `point = origin + Direction * (index * spacing)`.
    pub fn index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        let mut scaled = Vector::<D>::zeros();
        for i in 0..D {
            scaled[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled
    }
}

impl<const D: usize> Default for ImageMetadata<D> {
    fn default() -> Self {
        Self::with_spacing(Spacing::uniform(1.0))
    }
}
