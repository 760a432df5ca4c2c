use tracing::{instrument, trace};

use super::{
    gray_input,
    tables::{gray_quant_index_table, gray_quant_target_table},
};
use crate::{
    raster::{bits::set_field, Depth, Palette, Raster},
    Error, Result,
};

/// Thresholds to 1 bpp: a gray value below `thresh` becomes 1 (black).
///
/// Anything that is not 8 bpp gray is converted to gray first.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `thresh > 255`
#[instrument(skip(raster), level = "trace")]
pub fn threshold_to_binary(raster: &Raster, thresh: u32) -> Result<Raster> {
    if thresh > 255 {
        return Err(Error::invalid("thresh", format!("{thresh} > 255")));
    }
    let gray = gray_input(raster)?;
    let mut out = gray.blank_like(Depth::One)?;
    for y in 0..gray.height() as usize {
        let row = gray.gray_row(y);
        let dst = out.line_mut(y);
        for (x, &v) in row.iter().enumerate() {
            if u32::from(v) < thresh {
                set_field(dst, x, 1, 1);
            }
        }
    }
    Ok(out)
}

fn quantize(raster: &Raster, depth: Depth, nlevels: u32, with_palette: bool) -> Result<Raster> {
    let max = 1 << depth.bits();
    if !(2..=max).contains(&nlevels) {
        return Err(Error::invalid(
            "nlevels",
            format!("{nlevels} is outside [2, {max}]"),
        ));
    }
    let gray = gray_input(raster)?;
    let table = if with_palette {
        gray_quant_index_table(nlevels)?
    } else {
        gray_quant_target_table(nlevels, depth)?
    };
    let mut out = gray.blank_like(depth)?;
    for y in 0..gray.height() as usize {
        let row = gray.gray_row(y);
        let dst = out.line_mut(y);
        for (x, &v) in row.iter().enumerate() {
            set_field(dst, x, depth.bits(), u32::from(table[usize::from(v)]));
        }
    }
    if with_palette {
        out.set_palette(Some(Palette::linear(depth, nlevels)?))?;
    }
    trace!("quantized to {nlevels} levels at {depth} bpp");
    Ok(out)
}

/// Quantizes to 2 bpp with `nlevels` (2..=4) gray levels.
///
/// With `with_palette` the pixels are level indices and the output carries a
/// linear palette of `nlevels` grays. Otherwise the pixels are literal 2 bpp
/// samples over all four levels.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `nlevels` is out of range
#[instrument(skip(raster), level = "trace")]
pub fn threshold_to_2bpp(raster: &Raster, nlevels: u32, with_palette: bool) -> Result<Raster> {
    quantize(raster, Depth::Two, nlevels, with_palette)
}

/// Quantizes to 4 bpp with `nlevels` (2..=16) gray levels; see [`threshold_to_2bpp`]
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `nlevels` is out of range
#[instrument(skip(raster), level = "trace")]
pub fn threshold_to_4bpp(raster: &Raster, nlevels: u32, with_palette: bool) -> Result<Raster> {
    quantize(raster, Depth::Four, nlevels, with_palette)
}

/// Quantizes to `nlevels` (2..=256) gray levels while staying at 8 bpp.
/// Without a palette each level is stored as its gray value.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `nlevels` is out of range
#[instrument(skip(raster), level = "trace")]
pub fn threshold_on_8bpp(raster: &Raster, nlevels: u32, with_palette: bool) -> Result<Raster> {
    quantize(raster, Depth::Eight, nlevels, with_palette)
}
