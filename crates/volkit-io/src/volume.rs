//! Format dispatch by file extension.

use anyhow::{bail, Result};
use burn::tensor::backend::Backend;
use std::path::Path;
use volkit_core::image::Image;
use volkit_core::spatial::Spacing;

use crate::nifti_io::{read_nifti, write_nifti};
use crate::tiff_io::{read_tiff_stack, write_tiff_stack};

/// Supported volume file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Nifti,
    Tiff,
}

impl VolumeFormat {
    /// Format implied by the file name (`.nii`, `.nii.gz`, `.tif`, `.tiff`),
    /// ignoring case.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Ok(Self::Nifti)
        } else if name.ends_with(".tif") || name.ends_with(".tiff") {
            Ok(Self::Tiff)
        } else {
            bail!("Unrecognised volume format: {}", path.display())
        }
    }
}

/// Read a volume in any supported format.
///
/// `spacing` overrides the file's spacing; TIFF stacks use it (or unit
/// spacing) because the format does not store one.
pub fn read_volume<B: Backend, P: AsRef<Path>>(
    path: P,
    spacing: Option<Spacing<3>>,
    device: &B::Device,
) -> Result<Image<B, 3>> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path)? {
        VolumeFormat::Nifti => {
            let image = read_nifti(path, device)?;
            match spacing {
                Some(spacing) => Ok(image.with_spacing(spacing)?),
                None => Ok(image),
            }
        }
        VolumeFormat::Tiff => read_tiff_stack(path, spacing, device),
    }
}

/// Write a volume in the format implied by `path`.
pub fn write_volume<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path)? {
        VolumeFormat::Nifti => write_nifti(path, image),
        VolumeFormat::Tiff => write_tiff_stack(path, image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(VolumeFormat::from_path(Path::new("a/b.nii")).unwrap(), VolumeFormat::Nifti);
        assert_eq!(VolumeFormat::from_path(Path::new("B.NII.GZ")).unwrap(), VolumeFormat::Nifti);
        assert_eq!(VolumeFormat::from_path(Path::new("cells.tif")).unwrap(), VolumeFormat::Tiff);
        assert_eq!(VolumeFormat::from_path(Path::new("cells.TIFF")).unwrap(), VolumeFormat::Tiff);
        assert!(VolumeFormat::from_path(Path::new("cells.png")).is_err());
    }
}
