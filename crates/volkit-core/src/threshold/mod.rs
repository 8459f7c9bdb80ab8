//! Global intensity thresholds and mask creation.

mod li;
mod otsu;

pub use li::threshold_li;
pub use otsu::threshold_otsu;

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::image::{Image, Mask};

/// How a pipeline picks its global threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ThresholdMethod {
    Otsu {
        #[serde(default = "default_nbins")]
        nbins: usize,
    },
    Li {
        #[serde(default)]
        tolerance: Option<f64>,
    },
    /// Fixed intensity.
    Value { value: f64 },
}

fn default_nbins() -> usize {
    256
}

impl Default for ThresholdMethod {
    fn default() -> Self {
        ThresholdMethod::Otsu { nbins: default_nbins() }
    }
}

impl ThresholdMethod {
    /// Threshold value for `image`.
    pub fn compute<B: Backend, const D: usize>(&self, image: &Image<B, D>) -> Result<f64> {
        let t = match *self {
            ThresholdMethod::Otsu { nbins } => threshold_otsu(image, nbins)?,
            ThresholdMethod::Li { tolerance } => threshold_li(image, tolerance, None)?,
            ThresholdMethod::Value { value } => value,
        };
        info!(method = ?self, threshold = t, "computed threshold");
        Ok(t)
    }
}

/// Foreground where the intensity is strictly above `threshold`.
pub fn apply_threshold<B: Backend>(image: &Image<B, 3>, threshold: f64) -> Result<Mask> {
    Mask::from_image(image, |v| v as f64 > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageMetadata;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn bimodal() -> Image<Backend, 3> {
        let device = Default::default();
        let values = (0..64).map(|i| if i % 4 == 0 { 0.8 } else { 0.2 }).collect();
        Image::from_vec([4, 4, 4], values, &ImageMetadata::default(), &device).unwrap()
    }

    #[test]
    fn test_methods_split_two_levels() {
        let image = bimodal();
        for method in [
            ThresholdMethod::default(),
            ThresholdMethod::Li { tolerance: None },
            ThresholdMethod::Value { value: 0.5 },
        ] {
            let t = method.compute(&image).unwrap();
            let mask = apply_threshold(&image, t).unwrap();
            assert_eq!(mask.count(), 16, "{:?}", method);
        }
    }

    #[test]
    fn test_method_from_toml_style_json() {
        let method: ThresholdMethod = serde_json::from_str(r#"{"method":"otsu"}"#).unwrap();
        assert_eq!(method, ThresholdMethod::Otsu { nbins: 256 });
        let method: ThresholdMethod = serde_json::from_str(r#"{"method":"value","value":3.0}"#).unwrap();
        assert_eq!(method, ThresholdMethod::Value { value: 3.0 });
    }
}
