//! The linear segmentation pipeline behind `volkit run`.

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use volkit_core::exposure::{adjust_gamma, equalize_hist, rescale_intensity};
use volkit_core::filter::SobelFilter;
use volkit_core::image::{Image, LabelMap, Mask};
use volkit_core::measure::{marching_cubes, regionprops, Mesh, RegionProperties};
use volkit_core::morphology::{
    binary_closing, binary_opening, remove_small_holes, remove_small_objects, StructuringElement,
};
use volkit_core::segmentation::{
    distance_transform_edt, label, markers_from_peaks, peak_local_max, watershed,
};
use volkit_core::threshold::apply_threshold;
use volkit_io::{
    label_overlay, labels_in_plane, montage, read_volume, save_png, write_labels_nifti, write_nifti,
    write_obj, write_tiff_stack,
};

use crate::config::{Denoiser, PipelineConfig};

const STAGES: u64 = 9;

/// Summary of the mesh written to `surface.obj`.
#[derive(Debug, Clone, Serialize)]
pub struct MeshSummary {
    pub vertices: usize,
    pub faces: usize,
    pub surface_area: f64,
    pub enclosed_volume: f64,
}

/// Everything `volkit run` reports, written to `report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub shape: [usize; 3],
    pub spacing: [f64; 3],
    pub threshold: f64,
    pub foreground_voxels: usize,
    pub num_objects: usize,
    pub regions: Vec<RegionProperties>,
    pub mesh: Option<MeshSummary>,
    pub outputs: Vec<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn progress(&self) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(STAGES);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Ok(pb)
    }

    /// Run every stage on `input`, writing results into `output_dir`.
    pub fn run<B: Backend>(&self, input: &Path, output_dir: &Path, device: &B::Device) -> Result<RunReport> {
        let config = &self.config;
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
        let mut outputs = Vec::new();
        let pb = self.progress()?;

        pb.set_message("load");
        let raw: Image<B, 3> = read_volume(input, config.input.spacing(), device)?;
        let stats = raw.statistics()?;
        info!(shape = ?raw.shape(), spacing = ?raw.spacing().to_array(), ?stats, "loaded volume");
        pb.inc(1);

        pb.set_message("contrast");
        let mut contrast = rescale_intensity(&raw, config.contrast.range, (0.0, 1.0))?;
        if let Some(gamma) = config.contrast.gamma {
            contrast = adjust_gamma(&contrast, gamma, 1.0)?;
        }
        if config.contrast.equalize {
            contrast = equalize_hist(&contrast, 256)?;
        }
        self.write(&mut outputs, output_dir, "contrast", &contrast)?;
        pb.inc(1);

        pb.set_message("edges");
        if config.edges.enabled {
            let sobel = if config.edges.planewise {
                SobelFilter::planewise()
            } else {
                SobelFilter::new()
            };
            let edges = sobel.magnitude(&contrast)?;
            self.write(&mut outputs, output_dir, "edges", &edges)?;
        }
        pb.inc(1);

        pb.set_message("denoise");
        let denoised = match config.denoise.build() {
            Some(Denoiser::Gaussian(filter)) => filter.apply(&contrast)?,
            Some(Denoiser::Median(filter)) => filter.apply(&contrast)?,
            Some(Denoiser::Bilateral(filter)) => filter.apply(&contrast)?,
            None => contrast.clone(),
        };
        self.write(&mut outputs, output_dir, "denoised", &denoised)?;
        pb.inc(1);

        pb.set_message("threshold");
        let threshold = config.threshold.compute(&denoised)?;
        let mask = apply_threshold(&denoised, threshold)?;
        pb.inc(1);

        pb.set_message("morphology");
        let mask = self.clean_mask(mask)?;
        info!(foreground = mask.count(), "cleaned mask");
        let mask_path = output_dir.join("mask.nii.gz");
        write_nifti(&mask_path, &mask.to_image::<B>(device)?)?;
        outputs.push(mask_path);
        pb.inc(1);

        pb.set_message("segment");
        let labels = self.segment::<B>(&mask, device)?;
        let labels_path = output_dir.join("labels.nii.gz");
        write_labels_nifti::<B, _>(&labels_path, &labels, device)?;
        outputs.push(labels_path);
        pb.inc(1);

        pb.set_message("measure");
        let regions = regionprops(&labels, Some(&raw))?;
        info!(objects = regions.len(), "measured regions");
        pb.inc(1);

        pb.set_message("mesh");
        let mesh = if config.mesh.enabled {
            self.surface(&mask, &denoised, device)?
        } else {
            None
        };
        let mesh = match mesh {
            Some(mesh) => {
                let path = output_dir.join("surface.obj");
                write_obj(&path, &mesh)?;
                outputs.push(path);
                Some(MeshSummary {
                    vertices: mesh.vertices.len(),
                    faces: mesh.faces.len(),
                    surface_area: mesh.surface_area(),
                    enclosed_volume: mesh.enclosed_volume(),
                })
            }
            None => None,
        };
        pb.inc(1);

        outputs.extend(self.previews(output_dir, &contrast, &labels)?);

        let report = RunReport {
            input: input.to_path_buf(),
            shape: raw.shape(),
            spacing: raw.spacing().to_array(),
            threshold,
            foreground_voxels: mask.count(),
            num_objects: regions.len(),
            regions,
            mesh,
            outputs,
        };
        let report_path = output_dir.join("report.json");
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        pb.finish_with_message("done");
        info!(path = %report_path.display(), objects = report.num_objects, "pipeline complete");
        Ok(report)
    }

    fn write<B: Backend>(&self, outputs: &mut Vec<PathBuf>, dir: &Path, name: &str, image: &Image<B, 3>) -> Result<()> {
        let path = dir.join(format!("{}.nii.gz", name));
        write_nifti(&path, image)?;
        outputs.push(path);
        if self.config.output.tiff {
            let path = dir.join(format!("{}.tif", name));
            write_tiff_stack(&path, image)?;
            outputs.push(path);
        }
        Ok(())
    }

    fn clean_mask(&self, mut mask: Mask) -> Result<Mask> {
        let m = &self.config.morphology;
        if m.opening_radius > 0 {
            mask = binary_opening(&mask, &StructuringElement::ball(m.opening_radius))?;
        }
        if m.closing_radius > 0 {
            mask = binary_closing(&mask, &StructuringElement::ball(m.closing_radius))?;
        }
        if m.min_object_size > 1 {
            mask = remove_small_objects(&mask, m.min_object_size, m.connectivity)?;
        }
        if m.max_hole_size > 1 {
            mask = remove_small_holes(&mask, m.max_hole_size, m.connectivity)?;
        }
        Ok(mask)
    }

    fn segment<B: Backend>(&self, mask: &Mask, device: &B::Device) -> Result<LabelMap> {
        let w = &self.config.watershed;
        let labels = if w.enabled && mask.count() > 0 {
            let distance = distance_transform_edt::<B>(mask, device)?;
            let peaks = peak_local_max(&distance, &w.peaks.to_peak_config(), Some(mask))?;
            info!(markers = peaks.len(), "watershed markers");
            let markers = markers_from_peaks(mask.shape(), &peaks, *mask.metadata())?;
            let elevation = distance.with_data(distance.data().clone().neg());
            watershed(&elevation, &markers, Some(mask), w.connectivity)?
        } else {
            label(mask, self.config.morphology.connectivity)?
        };
        let labels = if w.clear_border { labels.clear_border() } else { labels };
        Ok(labels.relabel_sequential())
    }

    fn surface<B: Backend>(&self, mask: &Mask, denoised: &Image<B, 3>, device: &B::Device) -> Result<Option<Mesh>> {
        let (image, level) = match self.config.mesh.level {
            Some(level) => (denoised.clone(), level),
            None => (mask.to_image::<B>(device)?, 0.5),
        };
        let stats = image.statistics()?;
        if !(level > stats.min && level < stats.max) {
            warn!(level, min = stats.min, max = stats.max, "mesh level outside data range, skipping surface");
            return Ok(None);
        }
        Ok(Some(marching_cubes(&image, level)?))
    }

    fn previews<B: Backend>(&self, dir: &Path, contrast: &Image<B, 3>, labels: &LabelMap) -> Result<Vec<PathBuf>> {
        let out = &self.config.output;
        let montage_path = dir.join("montage.png");
        save_png(&montage_path, montage(contrast, out.montage_columns, out.montage_step)?)?;

        let middle = contrast.shape()[0] / 2;
        let plane = contrast.plane(0, middle)?;
        let overlay = label_overlay(&plane, &labels_in_plane(labels, middle)?, out.overlay_alpha)?;
        let overlay_path = dir.join("overlay.png");
        save_png(&overlay_path, overlay)?;
        Ok(vec![montage_path, overlay_path])
    }
}
