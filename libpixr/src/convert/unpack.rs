//! Table-driven depth expansion and the matching packing conversions.
//!
//! Expansion reads each source line in groups of 1, 2, 4 or 8 bits and writes
//! one table entry per group, so the per-pixel cost is a single lookup.

use tracing::{instrument, trace, warn};

use super::tables::{
    expand_1_to_16_table, expand_1_to_2_table, expand_1_to_32_table, expand_1_to_4_table,
    expand_1_to_8_table, expand_2_to_8_table, expand_4_to_8_table,
};
use crate::{
    raster::{
        bits::{get_byte, get_field, set_field},
        Depth, Palette, Raster, Rgb,
    },
    Error, Result,
};

fn require_depth(raster: &Raster, depth: Depth) -> Result<()> {
    if raster.depth() == depth {
        Ok(())
    } else {
        Err(Error::InvalidDepth(raster.depth().bits()))
    }
}

fn check_value(name: &'static str, value: u32, depth: Depth) -> Result<()> {
    if value <= depth.max_value() {
        Ok(())
    } else {
        Err(Error::invalid(
            name,
            format!("{value} does not fit in {depth} bits"),
        ))
    }
}

fn warn_dropped_palette(raster: &Raster) {
    if raster.palette().is_some() {
        warn!("palette present but ignored; remove it first for color-correct output");
    }
}

/// Applies an expansion table across every line of `src` into `dst`.
///
/// `group_bits` source bits index the table; each entry fills
/// `group_bits / src_bits * dst_bits` destination bits.
fn expand_lines(src: &Raster, dst: &mut Raster, group_bits: u32, table: &[u32]) {
    let src_bits = src.depth().bits();
    let out_bits = group_bits / src_bits * dst.depth().bits();
    let groups = (src.width() as usize * src_bits as usize).div_ceil(group_bits as usize);
    for y in 0..src.height() as usize {
        let line = src.line(y);
        let out = dst.line_mut(y);
        for g in 0..groups {
            let index = get_field(line, g, group_bits) as usize;
            set_field(out, g, out_bits, table[index]);
        }
    }
}

fn expand(src: &Raster, depth: Depth, group_bits: u32, table: &[u32]) -> Result<Raster> {
    let mut dst = src.blank_like(depth)?;
    expand_lines(src, &mut dst, group_bits, table);
    trace!(
        "expanded {}x{} from {} to {depth} bpp",
        src.width(),
        src.height(),
        src.depth()
    );
    Ok(dst)
}

/// Converts 1 bpp to 2 bpp, mapping 0 to `val0` and 1 to `val1`
///
/// # Errors
///
/// Returns an error if the input is not 1 bpp or a value exceeds 3
#[instrument(skip(raster), level = "trace")]
pub fn convert_1_to_2(raster: &Raster, val0: u8, val1: u8) -> Result<Raster> {
    require_depth(raster, Depth::One)?;
    check_value("val0", val0.into(), Depth::Two)?;
    check_value("val1", val1.into(), Depth::Two)?;
    warn_dropped_palette(raster);
    expand(raster, Depth::Two, 8, &expand_1_to_2_table(val0, val1))
}

/// Converts 1 bpp to 4 bpp, mapping 0 to `val0` and 1 to `val1`
///
/// # Errors
///
/// Returns an error if the input is not 1 bpp or a value exceeds 15
#[instrument(skip(raster), level = "trace")]
pub fn convert_1_to_4(raster: &Raster, val0: u8, val1: u8) -> Result<Raster> {
    require_depth(raster, Depth::One)?;
    check_value("val0", val0.into(), Depth::Four)?;
    check_value("val1", val1.into(), Depth::Four)?;
    warn_dropped_palette(raster);
    expand(raster, Depth::Four, 8, &expand_1_to_4_table(val0, val1))
}

/// Converts 1 bpp to 8 bpp, mapping 0 to `val0` and 1 to `val1`
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 1 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_1_to_8(raster: &Raster, val0: u8, val1: u8) -> Result<Raster> {
    require_depth(raster, Depth::One)?;
    warn_dropped_palette(raster);
    expand(raster, Depth::Eight, 4, &expand_1_to_8_table(val0, val1))
}

/// Converts 1 bpp to 16 bpp, mapping 0 to `val0` and 1 to `val1`
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 1 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_1_to_16(raster: &Raster, val0: u16, val1: u16) -> Result<Raster> {
    require_depth(raster, Depth::One)?;
    warn_dropped_palette(raster);
    expand(raster, Depth::Sixteen, 2, &expand_1_to_16_table(val0, val1))
}

/// Converts 1 bpp to 32 bpp, mapping 0 to `val0` and 1 to `val1`
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 1 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_1_to_32(raster: &Raster, val0: u32, val1: u32) -> Result<Raster> {
    require_depth(raster, Depth::One)?;
    warn_dropped_palette(raster);
    expand(raster, Depth::ThirtyTwo, 1, &expand_1_to_32_table(val0, val1))
}

fn gray_palette(values: &[u8]) -> Result<Palette> {
    let mut palette = Palette::new(Depth::Eight)?;
    for &v in values {
        palette.add_color(Rgb::gray(v))?;
    }
    Ok(palette)
}

/// Converts 2 bpp to 8 bpp.
///
/// With `keep_palette` the output holds the original indices and carries the
/// source palette promoted to depth 8 (or, if there was none, a palette built
/// from `values`). Otherwise each index `i` becomes the literal `values[i]`.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 2 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_2_to_8(raster: &Raster, values: [u8; 4], keep_palette: bool) -> Result<Raster> {
    require_depth(raster, Depth::Two)?;
    if keep_palette {
        let palette = match raster.palette() {
            Some(p) => p.with_depth(Depth::Eight)?,
            None => gray_palette(&values)?,
        };
        let mut out = expand(raster, Depth::Eight, 8, &expand_2_to_8_table([0, 1, 2, 3]))?;
        out.set_palette(Some(palette))?;
        return Ok(out);
    }
    warn_dropped_palette(raster);
    expand(raster, Depth::Eight, 8, &expand_2_to_8_table(values))
}

/// Converts 4 bpp to 8 bpp.
///
/// With `keep_palette` the output holds the original indices and carries the
/// source palette promoted to depth 8 (or a 16-level linear gray palette).
/// Otherwise values are spread linearly: `v * 17`.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 4 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_4_to_8(raster: &Raster, keep_palette: bool) -> Result<Raster> {
    require_depth(raster, Depth::Four)?;
    let indices: [u8; 16] = std::array::from_fn(|i| i as u8);
    if keep_palette {
        let palette = match raster.palette() {
            Some(p) => p.with_depth(Depth::Eight)?,
            None => gray_palette(&indices.map(|i| i * 17))?,
        };
        let mut out = expand(raster, Depth::Eight, 8, &expand_4_to_8_table(indices))?;
        out.set_palette(Some(palette))?;
        return Ok(out);
    }
    warn_dropped_palette(raster);
    expand(raster, Depth::Eight, 8, &expand_4_to_8_table(indices.map(|i| i * 17)))
}

fn pack_from_8(raster: &Raster, depth: Depth) -> Result<Raster> {
    require_depth(raster, Depth::Eight)?;
    warn_dropped_palette(raster);
    let shift = 8 - depth.bits();
    let mut out = raster.blank_like(depth)?;
    for y in 0..raster.height() as usize {
        let line = raster.line(y);
        let dst = out.line_mut(y);
        for x in 0..raster.width() as usize {
            set_field(dst, x, depth.bits(), u32::from(get_byte(line, x) >> shift));
        }
    }
    Ok(out)
}

/// Converts 8 bpp to 2 bpp by keeping the two most significant bits; the
/// inverse of [`convert_2_to_8`] with values `[0, 85, 170, 255]`
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 8 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_8_to_2(raster: &Raster) -> Result<Raster> {
    pack_from_8(raster, Depth::Two)
}

/// Converts 8 bpp to 4 bpp by keeping the four most significant bits; the
/// inverse of [`convert_4_to_8`]
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 8 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_8_to_4(raster: &Raster) -> Result<Raster> {
    pack_from_8(raster, Depth::Four)
}

/// Converts 8 bpp to 16 bpp by shifting left by `left_shift` (0..=8). A
/// shift of 8 replicates the byte into both halves, so 0xff becomes 0xffff.
///
/// # Errors
///
/// Returns an error if the input is not 8 bpp or `left_shift > 8`
#[instrument(skip(raster), level = "trace")]
pub fn convert_8_to_16(raster: &Raster, left_shift: u32) -> Result<Raster> {
    require_depth(raster, Depth::Eight)?;
    if left_shift > 8 {
        return Err(Error::invalid("left_shift", format!("{left_shift} > 8")));
    }
    warn_dropped_palette(raster);
    let mut out = raster.blank_like(Depth::Sixteen)?;
    for y in 0..raster.height() as usize {
        let line = raster.line(y);
        let dst = out.line_mut(y);
        for x in 0..raster.width() as usize {
            let v = u32::from(get_byte(line, x));
            let v = if left_shift == 8 { v << 8 | v } else { v << left_shift };
            set_field(dst, x, 16, v);
        }
    }
    Ok(out)
}

/// Which byte of a 16 bpp sample survives in [`convert_16_to_8`]
#[derive(Debug, Eq, PartialEq, Copy, Clone, Default)]
pub enum ByteSelect {
    /// most significant byte
    #[default]
    Msb,
    /// least significant byte
    Lsb,
    /// the sample clipped to 255
    ClipToFf,
}

/// Converts 16 bpp to 8 bpp
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the input is not 16 bpp
#[instrument(skip(raster), level = "trace")]
pub fn convert_16_to_8(raster: &Raster, select: ByteSelect) -> Result<Raster> {
    require_depth(raster, Depth::Sixteen)?;
    let mut out = raster.blank_like(Depth::Eight)?;
    for y in 0..raster.height() as usize {
        let line = raster.line(y);
        let dst = out.line_mut(y);
        for x in 0..raster.width() as usize {
            let v = get_field(line, x, 16);
            let v = match select {
                ByteSelect::Msb => v >> 8,
                ByteSelect::Lsb => v & 0xff,
                ByteSelect::ClipToFf => v.min(0xff),
            };
            set_field(dst, x, 8, v);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, depth: Depth, f: impl Fn(u32, u32) -> u32) -> Raster {
        let mut r = Raster::new(width, height, depth).unwrap();
        for y in 0..height {
            for x in 0..width {
                r.set_pixel(x, y, f(x, y)).unwrap();
            }
        }
        r
    }

    #[test]
    fn two_bit_round_trip() {
        let src = filled(37, 3, Depth::Two, |x, y| (x + y) % 4);
        let wide = convert_2_to_8(&src, [0, 85, 170, 255], false).unwrap();
        assert_eq!(wide.get_pixel(1, 0).unwrap(), 85);
        assert_eq!(wide.get_pixel(3, 0).unwrap(), 255);
        let back = convert_8_to_2(&wide).unwrap();
        assert!(back.pixels().eq(src.pixels()));
    }

    #[test]
    fn four_bit_round_trip() {
        let src = filled(19, 2, Depth::Four, |x, y| (x * 3 + y) % 16);
        let wide = convert_4_to_8(&src, false).unwrap();
        assert_eq!(wide.get_pixel(5, 0).unwrap(), 15 * 17);
        let back = convert_8_to_4(&wide).unwrap();
        assert!(back.pixels().eq(src.pixels()));
    }

    #[test]
    fn one_bit_expansions() {
        let src = filled(45, 2, Depth::One, |x, y| (x + y) % 3 / 2);
        let expect = |r: &Raster, v0: u32, v1: u32| {
            for (x, y, v) in src.pixels() {
                let want = if v == 1 { v1 } else { v0 };
                assert_eq!(r.get_pixel(x, y).unwrap(), want, "({x}, {y}) at {}", r.depth());
            }
        };
        expect(&convert_1_to_2(&src, 1, 2).unwrap(), 1, 2);
        expect(&convert_1_to_4(&src, 0, 9).unwrap(), 0, 9);
        expect(&convert_1_to_8(&src, 255, 0).unwrap(), 255, 0);
        expect(&convert_1_to_16(&src, 7, 0xabcd).unwrap(), 7, 0xabcd);
        expect(&convert_1_to_32(&src, 0xffff_ff00, 0).unwrap(), 0xffff_ff00, 0);
        assert!(convert_1_to_2(&src, 4, 0).is_err());
        assert!(convert_1_to_4(&src, 0, 16).is_err());
    }

    #[test]
    fn wrong_source_depth() {
        let r = Raster::new(4, 4, Depth::Eight).unwrap();
        assert_eq!(convert_1_to_8(&r, 0, 1), Err(Error::InvalidDepth(8)));
        assert_eq!(convert_2_to_8(&r, [0; 4], false), Err(Error::InvalidDepth(8)));
        assert_eq!(convert_16_to_8(&r, ByteSelect::Msb), Err(Error::InvalidDepth(8)));
    }

    #[test]
    fn keep_palette_keeps_indices() {
        let mut src = filled(6, 1, Depth::Two, |x, _| x % 4);
        let mut palette = Palette::new(Depth::Two).unwrap();
        for c in [(1, 2, 3), (4, 5, 6), (7, 8, 9), (10, 11, 12)] {
            palette.add_color(c).unwrap();
        }
        src.set_palette(Some(palette.clone())).unwrap();
        let out = convert_2_to_8(&src, [0, 85, 170, 255], true).unwrap();
        assert_eq!(out.get_pixel(3, 0).unwrap(), 3);
        assert_eq!(out.palette().unwrap().colors(), palette.colors());
        assert_eq!(out.palette().unwrap().depth(), Depth::Eight);

        let plain = filled(3, 1, Depth::Four, |x, _| x + 4);
        let out = convert_4_to_8(&plain, true).unwrap();
        assert_eq!(out.get_pixel(2, 0).unwrap(), 6);
        assert_eq!(out.palette().unwrap().get(6).unwrap(), Rgb::gray(102));
    }

    #[test]
    fn sixteen_bit_conversions() {
        let src = filled(3, 1, Depth::Eight, |x, _| [0x12, 0xff, 0][x as usize]);
        let wide = convert_8_to_16(&src, 8).unwrap();
        assert_eq!(wide.get_pixel(1, 0).unwrap(), 0xffff);
        let shifted = convert_8_to_16(&src, 4).unwrap();
        assert_eq!(shifted.get_pixel(0, 0).unwrap(), 0x120);
        assert!(convert_8_to_16(&src, 9).is_err());

        let back = convert_16_to_8(&wide, ByteSelect::Msb).unwrap();
        assert!(back.pixels().eq(src.pixels()));
        let lsb = convert_16_to_8(&shifted, ByteSelect::Lsb).unwrap();
        assert_eq!(lsb.get_pixel(0, 0).unwrap(), 0x20);
        let clip = convert_16_to_8(&shifted, ByteSelect::ClipToFf).unwrap();
        assert_eq!(clip.get_pixel(0, 0).unwrap(), 0xff);
    }
}
