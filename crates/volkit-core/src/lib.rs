pub mod error;
pub mod spatial;
pub mod image;
pub mod exposure;
pub mod filter;
pub mod threshold;
pub mod morphology;
pub mod segmentation;
pub mod measure;

pub use error::{Result, VolumeError};
pub use image::{Connectivity, Image, ImageMetadata, LabelMap, Mask};
pub use spatial::{Direction, Point, Spacing, Vector};
