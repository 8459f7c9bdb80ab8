//! Exposure and contrast adjustment.

pub mod histogram;
pub mod contrast;

pub use histogram::{histogram, percentile, percentiles, Histogram};
pub use contrast::{
    adjust_gamma, adjust_log, adjust_sigmoid, equalize_hist, rescale_intensity, IntensityRange,
};
