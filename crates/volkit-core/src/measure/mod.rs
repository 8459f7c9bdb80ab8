//! Region measurements and surface extraction.

mod marching_cubes;
mod regionprops;

pub use marching_cubes::{marching_cubes, Mesh};
pub use regionprops::{regionprops, IntensityStats, RegionProperties};
