//! Marker-controlled watershed by priority flooding.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use burn::tensor::backend::Backend;
use tracing::debug;

use crate::error::Result;
use crate::image::{Connectivity, Image, LabelMap, Mask};

#[derive(Debug, Clone, Copy)]
struct Entry {
    elevation: f32,
    age: u64,
    index: usize,
}

// Reversed so the max-heap pops the lowest elevation, then the oldest entry.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .elevation
            .total_cmp(&self.elevation)
            .then_with(|| other.age.cmp(&self.age))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// Flood `elevation` from `markers`.
///
/// Voxels are claimed lowest elevation first; among equal elevations the
/// voxel queued first wins. A voxel takes the label of the neighbour that
/// queued it. Voxels outside `mask` stay 0 and markers outside it are
/// dropped.
pub fn watershed<B: Backend>(
    elevation: &Image<B, 3>,
    markers: &LabelMap,
    mask: Option<&Mask>,
    connectivity: Connectivity,
) -> Result<LabelMap> {
    let grid = *markers.grid();
    grid.ensure_same(elevation.shape())?;
    if let Some(mask) = mask {
        grid.ensure_same(mask.shape())?;
    }
    let values = elevation.to_vec()?;
    let inside = |i: usize| mask.map_or(true, |m| m.as_slice()[i]);
    let offsets = connectivity.offsets();

    let mut labels: Vec<u32> = markers
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, &l)| if inside(i) { l } else { 0 })
        .collect();

    let mut heap = BinaryHeap::new();
    let mut age = 0u64;
    for (index, &l) in labels.iter().enumerate() {
        if l != 0 {
            heap.push(Entry {
                elevation: values[index],
                age,
                index,
            });
            age += 1;
        }
    }

    while let Some(Entry { index, .. }) = heap.pop() {
        let label = labels[index];
        let coords = grid.coords(index);
        for &delta in &offsets {
            let Some(n) = grid.offset(coords, delta) else { continue };
            if labels[n] != 0 || !inside(n) {
                continue;
            }
            labels[n] = label;
            heap.push(Entry {
                elevation: values[n],
                age,
                index: n,
            });
            age += 1;
        }
    }

    debug!(queued = age, "watershed flood complete");
    LabelMap::new(grid.shape(), labels, *markers.metadata())
}
