//! Smoothing, denoising and edge filters.
//!
//! Linear filters (Gaussian, Sobel) run as separable tensor convolutions.
//! Non-linear filters (median, bilateral) work on host buffers and are
//! parallel over planes.

pub(crate) mod convolution;
pub mod gaussian;
pub mod sobel;
pub mod median;
pub mod bilateral;

pub use gaussian::GaussianFilter;
pub use sobel::SobelFilter;
pub use median::MedianFilter;
pub use bilateral::BilateralFilter;
