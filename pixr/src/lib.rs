use std::{collections::HashMap, fs::File, path::Path};

use anyhow::{bail, Context, Result};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};
use libpixr::{
    convert, dither, raster::extract_rgb, scale, Depth, DitherOptions, Palette, PaletteTarget,
    Raster, Rgb,
};
use tracing::{debug, info, instrument, warn};

/// How a gray image is brought down to one bit per pixel
#[derive(Debug, Clone, Copy)]
pub enum BinaryMode {
    /// pixels darker than the threshold become black
    Threshold(u32),
    /// Floyd-Steinberg error diffusion
    Dither(DitherOptions),
}

/// Target size of a rescale
#[derive(Debug, Clone, Copy)]
pub enum Size {
    /// the same factor on both axes
    Factor(f32),
    /// explicit dimensions, 0 keeps the aspect ratio
    Dimensions { width: u32, height: u32 },
}

/// Reads any image the `image` crate understands as 8 bpp gray or 32 bpp color
#[instrument]
pub fn load_raster(path: &Path) -> Result<Raster> {
    let img = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let (width, height) = (img.width(), img.height());
    let raster = if img.color().has_color() {
        Raster::from_rgb_bytes(width, height, &img.to_rgb8().into_raw())?
    } else {
        Raster::from_gray_bytes(width, height, &img.to_luma8().into_raw())?
    };
    debug!("Read {width}x{height} image at {} bpp", raster.depth());
    Ok(raster)
}

/// Reads an image and indexes its distinct colors into a palette of the
/// smallest depth that holds them
#[instrument]
pub fn load_indexed(path: &Path) -> Result<Raster> {
    let img = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let rgb = img.to_rgb8();
    let mut indices: HashMap<Rgb, u32> = HashMap::new();
    let mut colors = Vec::new();
    for p in rgb.pixels() {
        let color = Rgb::new(p[0], p[1], p[2]);
        indices.entry(color).or_insert_with(|| {
            colors.push(color);
            (colors.len() - 1) as u32
        });
    }
    debug!("Read {} unique colors from image", colors.len());

    let depth = match colors.len() {
        0..=2 => Depth::One,
        3..=4 => Depth::Two,
        5..=16 => Depth::Four,
        17..=256 => Depth::Eight,
        n => bail!("{n} colors do not fit in a palette"),
    };
    let mut palette = Palette::new(depth)?;
    for color in &colors {
        palette.add_color(*color)?;
    }
    let mut raster = Raster::new(rgb.width(), rgb.height(), depth)?;
    for (x, y, p) in rgb.enumerate_pixels() {
        if let Some(&index) = indices.get(&Rgb::new(p[0], p[1], p[2])) {
            raster.set_pixel(x, y, index)?;
        }
    }
    raster.set_palette(Some(palette))?;
    Ok(raster)
}

/// Writes a raster as PNG: 1 bpp as black and white, 32 bpp as RGB and
/// everything else as 8-bit gray. A palette is removed first.
#[instrument(skip(raster))]
pub fn save_raster(raster: &Raster, output_name: &Path) -> Result<()> {
    let raster = if raster.palette().is_some() {
        convert::remove_palette(raster, PaletteTarget::Auto)?
    } else {
        raster.clone()
    };
    let (bytes, color_type): (Vec<u8>, _) = match raster.depth() {
        // ON pixels are black
        Depth::One => (
            raster
                .pixels()
                .map(|(_, _, v)| if v == 1 { 0 } else { 255 })
                .collect(),
            ExtendedColorType::L8,
        ),
        Depth::ThirtyTwo => (
            raster
                .pixels()
                .flat_map(|(_, _, v)| {
                    let c = extract_rgb(v);
                    [c.red, c.green, c.blue]
                })
                .collect(),
            ExtendedColorType::Rgb8,
        ),
        _ => (
            convert::convert_to_gray(&raster)?
                .pixels()
                .map(|(_, _, v)| v as u8)
                .collect(),
            ExtendedColorType::L8,
        ),
    };

    let output = File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(output_name)?;

    info!("Writing {} bpp image to {}", raster.depth(), output_name.display());
    let encoder = PngEncoder::new(output);
    encoder.write_image(&bytes, raster.width(), raster.height(), color_type)?;
    info!("Successfully wrote image to {}", output_name.display());
    Ok(())
}

#[instrument]
pub fn to_gray(input: &Path, output_name: &Path) -> Result<()> {
    let raster = load_raster(input)?;
    save_raster(&convert::convert_to_gray(&raster)?, output_name)
}

/// Converts to gray, optionally enlarges by 2x or 4x, and reduces to 1 bpp
#[instrument]
pub fn binarize(input: &Path, output_name: &Path, mode: BinaryMode, upsample: u32) -> Result<()> {
    let gray = convert::convert_to_gray(&load_raster(input)?)?;
    let binary = match (mode, upsample) {
        (BinaryMode::Threshold(thresh), 1) => convert::threshold_to_binary(&gray, thresh)?,
        (BinaryMode::Threshold(thresh), 2) => scale::scale_gray_2x_li_thresh(&gray, thresh)?,
        (BinaryMode::Threshold(thresh), 4) => scale::scale_gray_4x_li_thresh(&gray, thresh)?,
        (BinaryMode::Dither(options), 1) => dither::dither_to_binary(&gray, &options)?,
        (BinaryMode::Dither(options), factor @ (2 | 4)) => {
            if options != DitherOptions::default() {
                warn!("clip values are ignored when dithering with upsampling");
            }
            if factor == 2 {
                scale::scale_gray_2x_li_dither(&gray)?
            } else {
                scale::scale_gray_4x_li_dither(&gray)?
            }
        }
        (_, factor) => bail!("upsampling factor must be 1, 2 or 4, got {factor}"),
    };
    save_raster(&binary, output_name)
}

#[instrument]
pub fn rescale(input: &Path, output_name: &Path, size: Size) -> Result<()> {
    let raster = load_raster(input)?;
    let scaled = match size {
        Size::Factor(factor) => scale::scale(&raster, factor, factor)?,
        Size::Dimensions { width, height } => scale::scale_to_size(&raster, width, height)?,
    };
    debug!("Scaled to {}x{}", scaled.width(), scaled.height());
    save_raster(&scaled, output_name)
}

/// Quantizes to `nlevels` gray levels at the smallest depth that holds them
#[instrument]
pub fn levels(input: &Path, output_name: &Path, nlevels: u32, with_palette: bool) -> Result<()> {
    let gray = convert::convert_to_gray(&load_raster(input)?)?;
    let quantized = match nlevels {
        2..=4 => convert::threshold_to_2bpp(&gray, nlevels, with_palette)?,
        5..=16 => convert::threshold_to_4bpp(&gray, nlevels, with_palette)?,
        17..=256 => convert::threshold_on_8bpp(&gray, nlevels, with_palette)?,
        n => bail!("number of levels must be between 2 and 256, got {n}"),
    };
    save_raster(&quantized, output_name)
}

/// Indexes the colors of an image and removes the palette again toward `target`
#[instrument]
pub fn palette(input: &Path, output_name: &Path, target: PaletteTarget) -> Result<()> {
    let indexed = load_indexed(input)?;
    let removed = convert::remove_palette(&indexed, target)?;
    save_raster(&removed, output_name)
}
