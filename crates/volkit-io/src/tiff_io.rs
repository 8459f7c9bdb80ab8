//! Multi-page grayscale TIFF stacks.

use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::ColorType;
use tracing::{debug, info};
use volkit_core::image::{Image, ImageMetadata};
use volkit_core::spatial::Spacing;

/// Read every page of a grayscale TIFF as one plane of a volume.
///
/// TIFF carries no voxel spacing; `spacing` defaults to 1 on every axis.
/// All pages must share the first page's dimensions.
pub fn read_tiff_stack<B: Backend, P: AsRef<Path>>(
    path: P,
    spacing: Option<Spacing<3>>,
    device: &B::Device,
) -> Result<Image<B, 3>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open TIFF file {}", path.display()))?;
    let mut decoder = Decoder::new(BufReader::new(file)).context("Failed to read TIFF header")?;

    let (width, height) = decoder.dimensions().context("Failed to read TIFF dimensions")?;
    let mut values = Vec::new();
    let mut planes = 0usize;
    loop {
        let dims = decoder.dimensions().context("Failed to read TIFF dimensions")?;
        if dims != (width, height) {
            bail!(
                "TIFF page {} is {}x{}, expected {}x{}",
                planes,
                dims.0,
                dims.1,
                width,
                height
            );
        }
        match decoder.colortype().context("Failed to read TIFF color type")? {
            ColorType::Gray(_) => {}
            other => bail!("Only grayscale TIFF stacks are supported, page {} is {:?}", planes, other),
        }
        let page = decoder
            .read_image()
            .with_context(|| format!("Failed to decode TIFF page {}", planes))?;
        values.extend(page_to_f32(page)?);
        planes += 1;
        debug!(page = planes, "decoded TIFF page");

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().context("Failed to advance to next TIFF page")?;
    }

    let shape = [planes, height as usize, width as usize];
    let metadata = ImageMetadata::with_spacing(spacing.unwrap_or_else(|| Spacing::uniform(1.0)));
    info!(path = %path.display(), ?shape, "read TIFF stack");
    Image::from_vec(shape, values, &metadata, device).context("TIFF pixel count does not match its dimensions")
}

fn page_to_f32(page: DecodingResult) -> Result<Vec<f32>> {
    Ok(match page {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => bail!("Unsupported TIFF sample format"),
    })
}

/// Write a volume as a multi-page 32-bit float TIFF, one page per plane.
pub fn write_tiff_stack<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    let path = path.as_ref();
    let [planes, rows, cols] = image.shape();
    let values = image.to_vec().context("Failed to read image values")?;
    let file = File::create(path).with_context(|| format!("Failed to create TIFF file {}", path.display()))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).context("Failed to start TIFF encoder")?;

    let page = rows * cols;
    for z in 0..planes {
        encoder
            .write_image::<colortype::Gray32Float>(cols as u32, rows as u32, &values[z * page..(z + 1) * page])
            .with_context(|| format!("Failed to write TIFF page {}", z))?;
    }
    info!(path = %path.display(), shape = ?[planes, rows, cols], "wrote TIFF stack");
    Ok(())
}
