use std::collections::VecDeque;

use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::image::{Connectivity, LabelMap, Mask};

/// Label the connected components of `mask`.
///
/// Components are numbered `1..=N` in raster order of their first voxel;
/// background stays 0.
pub fn label(mask: &Mask, connectivity: Connectivity) -> Result<LabelMap> {
    let grid = *mask.grid();
    let input = mask.as_slice();
    let offsets = connectivity.offsets();
    let mut labels = vec![0u32; grid.len()];
    let mut queue = VecDeque::new();
    let mut next = 0u32;

    for start in 0..grid.len() {
        if !input[start] || labels[start] != 0 {
            continue;
        }
        next = next
            .checked_add(1)
            .ok_or_else(|| VolumeError::data_conversion("more components than fit in a u32 label"))?;
        labels[start] = next;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let coords = grid.coords(idx);
            for &delta in &offsets {
                if let Some(n) = grid.offset(coords, delta) {
                    if input[n] && labels[n] == 0 {
                        labels[n] = next;
                        queue.push_back(n);
                    }
                }
            }
        }
    }

    debug!(components = next, ?connectivity, "labeled mask");
    LabelMap::new(grid.shape(), labels, *mask.metadata())
}
