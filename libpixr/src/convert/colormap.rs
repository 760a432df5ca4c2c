use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, instrument, warn};

use crate::{
    raster::{
        bits::{get_field, set_field},
        compose_rgb, Depth, Palette, Raster, Rgb,
    },
    Result,
};

/// What a palette-indexed raster should become once its palette is removed
#[derive(Default, Debug, Eq, PartialEq, Copy, Clone, EnumString, IntoStaticStr, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PaletteTarget {
    /// 1 bpp, 1 = black; only meaningful for 1 bpp sources
    Binary,
    /// 8 bpp luma
    Grayscale,
    /// 32 bpp RGB
    FullColor,
    /// Grayscale (or binary for 1 bpp) if every entry is gray, otherwise full color
    #[default]
    Auto,
}

fn resolve_target(target: PaletteTarget, depth: Depth, palette: &Palette) -> PaletteTarget {
    let target = if target == PaletteTarget::Binary && depth != Depth::One {
        warn!("binary target requested for a {depth} bpp source; detecting target instead");
        PaletteTarget::Auto
    } else {
        target
    };
    match target {
        PaletteTarget::Auto if palette.has_color() => PaletteTarget::FullColor,
        PaletteTarget::Auto if depth == Depth::One => PaletteTarget::Binary,
        PaletteTarget::Auto => PaletteTarget::Grayscale,
        t => t,
    }
}

/// Table indexed by every value the source depth can hold; indices past the
/// end of the palette map to 0
fn index_table(palette: &Palette, depth: Depth, f: impl Fn(Rgb) -> u32) -> Vec<u32> {
    let mut table = vec![0; 1 << depth.bits()];
    for (entry, color) in table.iter_mut().zip(palette.colors()) {
        *entry = f(*color);
    }
    table
}

fn apply_table(raster: &Raster, table: &[u32], depth: Depth) -> Result<Raster> {
    let src_bits = raster.depth().bits();
    let mut out = raster.blank_like(depth)?;
    for y in 0..raster.height() as usize {
        let line = raster.line(y);
        let dst = out.line_mut(y);
        for x in 0..raster.width() as usize {
            let index = get_field(line, x, src_bits) as usize;
            set_field(dst, x, depth.bits(), table[index]);
        }
    }
    Ok(out)
}

/// Produces a palette-free raster from a palette-indexed one.
///
/// A raster without a palette comes back as an equal copy. A
/// [`PaletteTarget::Binary`] request for a source deeper than 1 bpp is logged
/// and treated as [`PaletteTarget::Auto`].
///
/// - binary: the bitmap is copied, and inverted if entry 0 is black so that 1
///   means black in the result
/// - grayscale: each index becomes the [`Rgb::luma`] of its entry, at 8 bpp
/// - full color: each index becomes its packed entry, at 32 bpp
///
/// # Errors
///
/// Returns [`crate::Error::Allocation`] if the output cannot be allocated
#[instrument(skip(raster), level = "trace")]
pub fn remove_palette(raster: &Raster, target: PaletteTarget) -> Result<Raster> {
    let Some(palette) = raster.palette() else {
        debug!("raster has no palette; returning a copy");
        return Ok(raster.clone());
    };
    let depth = raster.depth();
    let target = resolve_target(target, depth, palette);
    debug!("removing {}-entry palette to {target}", palette.len());
    match target {
        PaletteTarget::Binary => {
            let mut out = raster.clone();
            out.take_palette();
            if palette.get(0).is_ok_and(|c| c == Rgb::gray(0)) {
                out = out.inverted();
            }
            Ok(out)
        }
        PaletteTarget::Grayscale => {
            let table = index_table(palette, depth, |c| u32::from(c.luma()));
            apply_table(raster, &table, Depth::Eight)
        }
        PaletteTarget::FullColor | PaletteTarget::Auto => {
            let table = index_table(palette, depth, |c| compose_rgb(c.red, c.green, c.blue));
            apply_table(raster, &table, Depth::ThirtyTwo)
        }
    }
}
