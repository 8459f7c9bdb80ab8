//! Pipeline configuration, loaded from TOML.
//!
//! Every section is optional; a missing section or key takes the default
//! shown in [`PipelineConfig::default`].

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use volkit_core::exposure::IntensityRange;
use volkit_core::filter::{BilateralFilter, GaussianFilter, MedianFilter};
use volkit_core::image::Connectivity;
use volkit_core::morphology::StructuringElement;
use volkit_core::segmentation::PeakConfig;
use volkit_core::spatial::Spacing;
use volkit_core::threshold::ThresholdMethod;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub contrast: ContrastConfig,
    pub edges: EdgeConfig,
    pub denoise: DenoiseConfig,
    pub threshold: ThresholdMethod,
    pub morphology: MorphologyConfig,
    pub watershed: WatershedConfig,
    pub mesh: MeshConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(spacing) = self.input.spacing {
            Spacing::new(spacing).validate()?;
        }
        if let Some(gamma) = self.contrast.gamma {
            if !(gamma >= 0.0) {
                bail!("contrast.gamma must be non-negative, got {}", gamma);
            }
        }
        if self.output.montage_columns == 0 || self.output.montage_step == 0 {
            bail!("output.montage_columns and output.montage_step must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Voxel spacing `[plane, row, column]`, overriding the file's.
    pub spacing: Option<[f64; 3]>,
}

impl InputConfig {
    pub fn spacing(&self) -> Option<Spacing<3>> {
        self.spacing.map(Spacing::new)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Input range mapped onto `[0, 1]`.
    pub range: IntensityRange,
    pub gamma: Option<f64>,
    pub equalize: bool,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            range: IntensityRange::Percentiles { low: 0.5, high: 99.5 },
            gamma: None,
            equalize: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub enabled: bool,
    /// Sobel over rows and columns only, giving one 2D edge map per plane.
    pub planewise: bool,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            planewise: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DenoiseConfig {
    None,
    Gaussian {
        sigma: f64,
    },
    Median {
        #[serde(default = "default_radius")]
        radius: usize,
    },
    Bilateral {
        sigma_spatial: f64,
        #[serde(default)]
        sigma_color: Option<f64>,
    },
}

fn default_radius() -> usize {
    1
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        DenoiseConfig::Gaussian { sigma: 1.0 }
    }
}

/// A configured denoising filter.
pub enum Denoiser {
    Gaussian(GaussianFilter),
    Median(MedianFilter),
    Bilateral(BilateralFilter),
}

impl DenoiseConfig {
    pub fn build(&self) -> Option<Denoiser> {
        match *self {
            DenoiseConfig::None => None,
            DenoiseConfig::Gaussian { sigma } => Some(Denoiser::Gaussian(GaussianFilter::isotropic(sigma))),
            DenoiseConfig::Median { radius } => {
                Some(Denoiser::Median(MedianFilter::new(StructuringElement::ball(radius))))
            }
            DenoiseConfig::Bilateral {
                sigma_spatial,
                sigma_color,
            } => {
                let filter = BilateralFilter::new(sigma_spatial);
                Some(Denoiser::Bilateral(match sigma_color {
                    Some(sigma) => filter.with_sigma_color(sigma),
                    None => filter,
                }))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Ball radius for the opening; 0 disables it.
    pub opening_radius: usize,
    /// Ball radius for the closing; 0 disables it.
    pub closing_radius: usize,
    pub min_object_size: usize,
    pub max_hole_size: usize,
    pub connectivity: Connectivity,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            opening_radius: 1,
            closing_radius: 0,
            min_object_size: 64,
            max_hole_size: 64,
            connectivity: Connectivity::Face,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatershedConfig {
    /// Split touching objects; when off, connected components are the
    /// objects.
    pub enabled: bool,
    pub peaks: PeakSettings,
    pub connectivity: Connectivity,
    /// Drop objects touching a face of the volume.
    pub clear_border: bool,
}

impl Default for WatershedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            peaks: PeakSettings::default(),
            connectivity: Connectivity::Vertex,
            clear_border: false,
        }
    }
}

/// Marker detection on the distance map.
///
/// Cells may touch a face of the volume, so border peaks are kept unless
/// `exclude_border` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakSettings {
    pub min_distance: usize,
    pub threshold_abs: Option<f64>,
    pub threshold_rel: Option<f64>,
    pub exclude_border: bool,
    pub num_peaks: Option<usize>,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            min_distance: 5,
            threshold_abs: None,
            threshold_rel: None,
            exclude_border: false,
            num_peaks: None,
        }
    }
}

impl PeakSettings {
    pub fn to_peak_config(&self) -> PeakConfig {
        PeakConfig {
            min_distance: self.min_distance,
            threshold_abs: self.threshold_abs,
            threshold_rel: self.threshold_rel,
            exclude_border: self.exclude_border,
            num_peaks: self.num_peaks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub enabled: bool,
    /// Iso-level on the denoised image; `None` meshes the final mask at 0.5.
    pub level: Option<f64>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Also write every intermediate volume as a float TIFF stack.
    pub tiff: bool,
    pub montage_columns: usize,
    pub montage_step: usize,
    pub overlay_alpha: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tiff: false,
            montage_columns: 6,
            montage_step: 1,
            overlay_alpha: 0.5,
        }
    }
}
