//! Connected components, distance maps, seeds and watershed.

mod distance;
mod label;
mod peaks;
mod watershed;

pub use distance::distance_transform_edt;
pub use label::label;
pub use peaks::{markers_from_peaks, peak_local_max, Peak, PeakConfig};
pub use watershed::watershed;
