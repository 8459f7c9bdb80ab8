use anyhow::{bail, Result};
use burn_ndarray::{NdArray, NdArrayDevice};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use volkit_cli::{Pipeline, PipelineConfig};
use volkit_core::image::Image;
use volkit_core::spatial::Spacing;
use volkit_core::threshold::{threshold_li, threshold_otsu};
use volkit_io::{montage, read_volume, render_plane, save_png};

type Backend = NdArray<f32>;

#[derive(Parser)]
#[command(name = "volkit")]
#[command(about = "Segment, measure and preview 3D microscopy volumes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print shape, geometry and intensity statistics of a volume
    Info {
        /// NIfTI (.nii, .nii.gz) or TIFF stack (.tif, .tiff)
        path: PathBuf,

        /// Voxel spacing as plane,row,column
        #[arg(long, value_delimiter = ',', num_args = 3)]
        spacing: Option<Vec<f64>>,
    },

    /// Run the segmentation pipeline
    Run {
        path: PathBuf,

        /// TOML pipeline configuration; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "volkit_out")]
        output: PathBuf,

        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// Render one plane as a PNG
    Show {
        path: PathBuf,

        /// Plane index along the first axis; without it the whole volume is
        /// handed to the 2D renderer, which refuses it
        #[arg(long)]
        plane: Option<usize>,

        /// Output PNG
        #[arg(long, default_value = "plane.png")]
        out: PathBuf,
    },

    /// Tile planes of a volume into one PNG
    Montage {
        path: PathBuf,

        #[arg(long, default_value_t = 6)]
        columns: usize,

        /// Use every n-th plane
        #[arg(long, default_value_t = 1)]
        step: usize,

        #[arg(long, default_value = "montage.png")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let device = Default::default();

    match cli.command {
        Commands::Info { path, spacing } => {
            print_info(&path, parse_spacing(spacing)?, &device)?;
        }
        Commands::Run {
            path,
            config,
            output,
            quiet,
        } => {
            let config = match config {
                Some(config_path) => PipelineConfig::from_file(config_path)?,
                None => PipelineConfig::default(),
            };
            let report = Pipeline::new(config)
                .with_progress(!quiet)
                .run::<Backend>(&path, &output, &device)?;
            println!(
                "{} objects, threshold {:.4}, results in {}",
                report.num_objects,
                report.threshold,
                output.display()
            );
        }
        Commands::Show { path, plane, out } => {
            show(&path, plane, &out, &device)?;
        }
        Commands::Montage {
            path,
            columns,
            step,
            out,
        } => {
            let volume: Image<Backend, 3> = read_volume(&path, None, &device)?;
            save_png(&out, montage(&volume, columns, step)?)?;
            info!("Montage written to {}", out.display());
        }
    }

    Ok(())
}

fn parse_spacing(spacing: Option<Vec<f64>>) -> Result<Option<Spacing<3>>> {
    match spacing.as_deref() {
        None => Ok(None),
        Some(&[z, y, x]) => {
            let spacing = Spacing::new([z, y, x]);
            spacing.validate()?;
            Ok(Some(spacing))
        }
        Some(other) => bail!("Expected three spacing values, got {}", other.len()),
    }
}

fn print_info(path: &Path, spacing: Option<Spacing<3>>, device: &NdArrayDevice) -> Result<()> {
    let volume: Image<Backend, 3> = read_volume(path, spacing, device)?;
    let stats = volume.statistics()?;
    println!("path:      {}", path.display());
    println!("shape:     {:?}", volume.shape());
    println!("spacing:   {:?}", volume.spacing().to_array());
    println!("origin:    {:?}", volume.origin().to_array());
    println!(
        "intensity: min {:.4} max {:.4} mean {:.4} std {:.4}",
        stats.min, stats.max, stats.mean, stats.std
    );
    println!("otsu:      {:.4}", threshold_otsu(&volume, 256)?);
    println!("li:        {:.4}", threshold_li(&volume, None, None)?);
    Ok(())
}

fn show(path: &Path, plane: Option<usize>, out: &Path, device: &NdArrayDevice) -> Result<()> {
    let volume: Image<Backend, 3> = read_volume(path, None, device)?;
    let rendered = match plane {
        Some(index) => render_plane(&volume.plane(0, index)?, None),
        None => render_plane(&volume, None),
    };
    match rendered {
        Ok(image) => {
            save_png(out, image)?;
            info!("Plane written to {}", out.display());
        }
        Err(e) => {
            warn!("render failed: {}", e);
            println!("{}", e);
        }
    }
    Ok(())
}
