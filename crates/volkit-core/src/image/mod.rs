//! Image types: tensor-backed intensity images and host-side masks and
//! label maps that share the same geometry.

pub mod image;
pub mod metadata;
pub mod grid;
pub mod mask;
pub mod labels;

pub use image::{Image, ImageStatistics};
pub use metadata::ImageMetadata;
pub use grid::{Connectivity, Grid};
pub use mask::Mask;
pub use labels::LabelMap;
