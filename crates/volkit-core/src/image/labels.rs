//! Label volumes produced by connected-component labeling and watershed.

use burn::tensor::backend::Backend;

use crate::error::{Result, VolumeError};
use crate::image::{Grid, Image, ImageMetadata, Mask};

/// Host-side label volume. `0` is background; objects use labels `1..`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    grid: Grid,
    data: Vec<u32>,
    metadata: ImageMetadata<3>,
}

impl LabelMap {
    pub fn new(shape: [usize; 3], data: Vec<u32>, metadata: ImageMetadata<3>) -> Result<Self> {
        let grid = Grid::new(shape);
        if data.len() != grid.len() {
            return Err(VolumeError::invalid_parameter(format!(
                "expected {} labels for shape {:?}, got {}",
                grid.len(),
                shape,
                data.len()
            )));
        }
        Ok(Self { grid, data, metadata })
    }

    pub fn zeros(shape: [usize; 3], metadata: ImageMetadata<3>) -> Self {
        let grid = Grid::new(shape);
        Self {
            grid,
            data: vec![0; grid.len()],
            metadata,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn shape(&self) -> [usize; 3] {
        self.grid.shape()
    }

    pub fn metadata(&self) -> &ImageMetadata<3> {
        &self.metadata
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn get(&self, coords: [usize; 3]) -> u32 {
        self.data[self.grid.index(coords)]
    }

    pub fn set(&mut self, coords: [usize; 3], label: u32) {
        let idx = self.grid.index(coords);
        self.data[idx] = label;
    }

    /// Largest label present (0 for an all-background map).
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Number of distinct non-zero labels.
    pub fn num_labels(&self) -> usize {
        self.counts().iter().skip(1).filter(|&&c| c > 0).count()
    }

    /// Voxel count per label value, indexed by label (`counts[0]` is background).
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.max_label() as usize + 1];
        for &l in &self.data {
            counts[l as usize] += 1;
        }
        counts
    }

    /// Renumber labels to `1..=N` preserving their relative order.
    pub fn relabel_sequential(&self) -> Self {
        let counts = self.counts();
        let mut forward = vec![0u32; counts.len()];
        let mut next = 0u32;
        for (label, &count) in counts.iter().enumerate().skip(1) {
            if count > 0 {
                next += 1;
                forward[label] = next;
            }
        }
        self.mapped(|l| forward[l as usize])
    }

    /// Remove every object that touches a face of the volume.
    pub fn clear_border(&self) -> Self {
        let mut touching = vec![false; self.max_label() as usize + 1];
        for (idx, &l) in self.data.iter().enumerate() {
            if l != 0 && self.grid.on_border(self.grid.coords(idx)) {
                touching[l as usize] = true;
            }
        }
        self.mapped(|l| if touching[l as usize] { 0 } else { l })
    }

    /// Mask of the voxels carrying `label`.
    pub fn mask_of(&self, label: u32) -> Mask {
        let data = self.data.iter().map(|&l| l == label).collect();
        Mask::filled(self.shape(), false, self.metadata).with_data(data)
    }

    /// Mask of all labeled voxels.
    pub fn foreground(&self) -> Mask {
        let data = self.data.iter().map(|&l| l != 0).collect();
        Mask::filled(self.shape(), false, self.metadata).with_data(data)
    }

    /// Labels as float intensities, e.g. for writing to NIfTI.
    pub fn to_image<B: Backend>(&self, device: &B::Device) -> Result<Image<B, 3>> {
        let values = self.data.iter().map(|&l| l as f32).collect();
        Image::from_vec(self.shape(), values, &self.metadata, device)
    }

    fn mapped(&self, f: impl Fn(u32) -> u32) -> Self {
        Self {
            grid: self.grid,
            data: self.data.iter().map(|&l| f(l)).collect(),
            metadata: self.metadata,
        }
    }
}
