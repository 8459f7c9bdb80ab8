//! Binary morphology on host-side masks.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::image::{Connectivity, Grid, Mask};
use crate::morphology::StructuringElement;
use crate::segmentation::label;

/// How voxels outside the volume are treated.
#[derive(Clone, Copy)]
enum Border {
    /// Outside counts as foreground (erosion does not eat in from the faces).
    Foreground,
    /// Outside is ignored (dilation does not grow in from the faces).
    Ignore,
}

fn check_element(element: &StructuringElement) -> Result<()> {
    if element.is_empty() {
        return Err(VolumeError::invalid_parameter("structuring element is empty"));
    }
    Ok(())
}

/// Evaluate `all` (erosion) or `any` (dilation) over the element for every
/// voxel, one plane per rayon task.
fn sweep(mask: &Mask, offsets: &[[isize; 3]], erode: bool, border: Border) -> Mask {
    let grid: Grid = *mask.grid();
    if grid.is_empty() {
        return mask.clone();
    }
    let input = mask.as_slice();
    let [_, rows, cols] = grid.shape();
    let mut out = vec![false; grid.len()];

    out.par_chunks_mut(rows * cols).enumerate().for_each(|(z, plane)| {
        for y in 0..rows {
            for x in 0..cols {
                let hit = |o: &[isize; 3]| match grid.offset([z, y, x], *o) {
                    Some(idx) => input[idx],
                    None => matches!(border, Border::Foreground),
                };
                plane[y * cols + x] = if erode {
                    offsets.iter().all(hit)
                } else {
                    offsets.iter().any(hit)
                };
            }
        }
    });
    mask.with_data(out)
}

/// A voxel stays foreground only if every element voxel around it is
/// foreground.
pub fn binary_erosion(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    check_element(element)?;
    Ok(sweep(mask, element.offsets(), true, Border::Foreground))
}

/// A voxel becomes foreground if the reflected element placed on it hits
/// any foreground voxel.
pub fn binary_dilation(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    check_element(element)?;
    let reflected = element.reflected();
    Ok(sweep(mask, reflected.offsets(), false, Border::Ignore))
}

/// Erosion followed by dilation: removes structures smaller than the element.
pub fn binary_opening(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    binary_dilation(&binary_erosion(mask, element)?, element)
}

/// Dilation followed by erosion: closes gaps smaller than the element.
pub fn binary_closing(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    binary_erosion(&binary_dilation(mask, element)?, element)
}

/// Clear foreground components with fewer than `min_size` voxels.
pub fn remove_small_objects(mask: &Mask, min_size: usize, connectivity: Connectivity) -> Result<Mask> {
    let labels = label(mask, connectivity)?;
    let counts = labels.counts();
    let keep: Vec<bool> = counts.iter().map(|&c| c >= min_size).collect();
    let removed = counts.iter().skip(1).filter(|&&c| c < min_size).count();
    debug!(min_size, removed, "remove_small_objects");
    let data = labels
        .as_slice()
        .iter()
        .map(|&l| l != 0 && keep[l as usize])
        .collect();
    Ok(mask.with_data(data))
}

/// Fill background components with fewer than `area_threshold` voxels.
pub fn remove_small_holes(mask: &Mask, area_threshold: usize, connectivity: Connectivity) -> Result<Mask> {
    let filled = remove_small_objects(&mask.invert(), area_threshold, connectivity)?;
    Ok(filled.invert())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageMetadata;

    fn cube_mask(shape: [usize; 3], lo: usize, hi: usize) -> Mask {
        let mut mask = Mask::filled(shape, false, ImageMetadata::default());
        for z in lo..hi {
            for y in lo..hi {
                for x in lo..hi {
                    mask.set([z, y, x], true);
                }
            }
        }
        mask
    }

    #[test]
    fn test_erosion_shrinks_cube() {
        let mask = cube_mask([7, 7, 7], 1, 6);
        let eroded = binary_erosion(&mask, &StructuringElement::cube(3)).unwrap();
        assert_eq!(eroded.count(), 27);
        assert!(eroded.get([3, 3, 3]));
        assert!(!eroded.get([1, 1, 1]));
    }

    #[test]
    fn test_erosion_keeps_full_volume() {
        let mask = Mask::filled([3, 3, 3], true, ImageMetadata::default());
        let eroded = binary_erosion(&mask, &StructuringElement::ball(1)).unwrap();
        assert_eq!(eroded.count(), 27);
    }

    #[test]
    fn test_dilation_grows_point() {
        let mut mask = Mask::filled([5, 5, 5], false, ImageMetadata::default());
        mask.set([2, 2, 2], true);
        let dilated = binary_dilation(&mask, &StructuringElement::ball(1)).unwrap();
        assert_eq!(dilated.count(), 7);
        let dilated = binary_dilation(&mask, &StructuringElement::cube(3)).unwrap();
        assert_eq!(dilated.count(), 27);
    }

    #[test]
    fn test_dilation_uses_reflected_element() {
        let mut fp = vec![false; 27];
        fp[13] = true;
        fp[14] = true; // +x
        let element = StructuringElement::from_footprint([3, 3, 3], &fp).unwrap();
        let mut mask = Mask::filled([1, 1, 5], false, ImageMetadata::default());
        mask.set([0, 0, 2], true);
        let dilated = binary_dilation(&mask, &element).unwrap();
        assert_eq!(dilated.as_slice(), &[false, false, true, true, false]);
    }

    #[test]
    fn test_opening_removes_speck_closing_fills_gap() {
        let mut mask = cube_mask([9, 9, 9], 2, 7);
        mask.set([0, 0, 0], true);
        let opened = binary_opening(&mask, &StructuringElement::ball(1)).unwrap();
        assert!(!opened.get([0, 0, 0]));
        assert!(opened.get([4, 4, 4]));

        let mut holed = cube_mask([9, 9, 9], 2, 7);
        holed.set([4, 4, 4], false);
        let closed = binary_closing(&holed, &StructuringElement::ball(1)).unwrap();
        assert!(closed.get([4, 4, 4]));
    }

    #[test]
    fn test_remove_small_objects_and_holes() {
        let mut mask = cube_mask([8, 8, 8], 1, 4);
        mask.set([6, 6, 6], true);
        let cleaned = remove_small_objects(&mask, 2, Connectivity::Face).unwrap();
        assert!(!cleaned.get([6, 6, 6]));
        assert_eq!(cleaned.count(), 27);

        let mut holed = cube_mask([8, 8, 8], 1, 6);
        holed.set([3, 3, 3], false);
        let filled = remove_small_holes(&holed, 2, Connectivity::Face).unwrap();
        assert!(filled.get([3, 3, 3]));
        assert_eq!(filled.count(), 125);
    }
}
