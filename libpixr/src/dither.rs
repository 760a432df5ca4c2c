//! Floyd–Steinberg error diffusion from 8 bpp gray to 1 or 2 bpp.
//!
//! Two working rows are carried: the current row and the one below it, which
//! accumulates error as the current row is processed. A pixel pushes 3/8 of
//! its error to the right, 3/8 below and 1/4 diagonally below-right. The last
//! column pushes only downward and the last row only rightward.
//!
//! The clip distances stop error propagation from pixels that are already
//! close to black or white, which keeps error from accumulating along dark
//! margins and light backgrounds.

use bon::Builder;
use tracing::{instrument, trace};

use crate::{
    convert::eight_bit_input,
    raster::{bits::set_field, Depth, Palette, Raster},
    Error, Result,
};

/// Clip distances for error diffusion
#[derive(Builder, Debug, Eq, PartialEq, Copy, Clone)]
pub struct DitherOptions {
    /// Pixels within this distance of black become black without pushing
    /// their error to their neighbors
    #[builder(default = 10)]
    lower_clip: u32,
    /// Pixels within this distance of white become white without pushing
    /// their error to their neighbors
    #[builder(default = 10)]
    upper_clip: u32,
}

impl Default for DitherOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DitherOptions {
    /// The clips used for 4-level output: 5 and 5
    #[must_use]
    pub fn two_bit() -> Self {
        Self::builder().lower_clip(5).upper_clip(5).build()
    }

    /// Returns the black clip distance
    #[must_use]
    pub const fn lower_clip(&self) -> u32 {
        self.lower_clip
    }

    /// Returns the white clip distance
    #[must_use]
    pub const fn upper_clip(&self) -> u32 {
        self.upper_clip
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("lower_clip", self.lower_clip), ("upper_clip", self.upper_clip)] {
            if value > 255 {
                return Err(Error::invalid(name, format!("{value} > 255")));
            }
        }
        Ok(())
    }
}

fn spread(value: u8, delta: i32) -> u8 {
    u8::try_from((i32::from(value) + delta).clamp(0, 255)).unwrap_or(u8::MAX)
}

/// Dithers one row to 1 bpp, writing into `dst` (which must start zeroed)
/// and pushing error into the rest of `cur` and into `next` when present.
pub(crate) fn dither_binary_line(
    cur: &mut [u8],
    mut next: Option<&mut [u8]>,
    dst: &mut [u32],
    options: &DitherOptions,
) {
    let Some(last) = cur.len().checked_sub(1) else {
        return;
    };
    for j in 0..=last {
        let value = cur[j];
        // positive error pushes toward white, negative toward black
        let error = if value > 127 {
            let e = 255 - u32::from(value);
            if e > options.upper_clip {
                -i32::try_from(e).unwrap_or(0)
            } else {
                0
            }
        } else {
            set_field(dst, j, 1, 1);
            if u32::from(value) > options.lower_clip {
                i32::from(value)
            } else {
                0
            }
        };
        if error == 0 {
            continue;
        }
        let three_eighths = error * 3 / 8;
        let quarter = error / 4;
        if j < last {
            cur[j + 1] = spread(cur[j + 1], three_eighths);
        }
        if let Some(below) = next.as_deref_mut() {
            below[j] = spread(below[j], three_eighths);
            if j < last {
                below[j + 1] = spread(below[j + 1], quarter);
            }
        }
    }
}

/// Dithers 8 bpp gray to 1 bpp, where 1 is black.
///
/// A palette-indexed input of any depth is first removed to gray.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] for palette-free input that is not 8 bpp
/// and [`Error::InvalidParameter`] if a clip exceeds 255
#[instrument(skip(raster), level = "trace")]
pub fn dither_to_binary(raster: &Raster, options: &DitherOptions) -> Result<Raster> {
    options.validate()?;
    let gray = eight_bit_input(raster)?;
    let mut out = gray.blank_like(Depth::One)?;
    let height = gray.height() as usize;
    if height == 0 {
        return Ok(out);
    }
    let mut cur = gray.gray_row(0);
    for y in 0..height {
        let mut next = (y + 1 < height).then(|| gray.gray_row(y + 1));
        dither_binary_line(&mut cur, next.as_deref_mut(), out.line_mut(y), options);
        if let Some(next) = next {
            cur = next;
        }
    }
    trace!("dithered {}x{} to binary", gray.width(), gray.height());
    Ok(out)
}

/// Per-input-value output level and error shares for 4-level dithering
struct TwoBitTables {
    level: [u8; 256],
    three_eighths: [i32; 256],
    quarter: [i32; 256],
}

impl TwoBitTables {
    /// Levels sit at 0, 85, 170 and 255; inputs within `clip_to_black` of 0
    /// or `clip_to_white` of 255 quantize without spreading any error
    fn new(clip_to_black: u32, clip_to_white: u32) -> Self {
        let mut tables = Self {
            level: [0; 256],
            three_eighths: [0; 256],
            quarter: [0; 256],
        };
        let white_edge = 255 - i32::try_from(clip_to_white.min(255)).unwrap_or(255);
        let black_edge = i32::try_from(clip_to_black.min(255)).unwrap_or(0);
        for i in 0..256i32 {
            let (level, error, bias) = match i {
                i if i <= black_edge => (0, 0, 0),
                i if i < 43 => (0, i, 1),
                i if i < 85 => (1, i - 85, -1),
                i if i < 128 => (1, i - 85, 1),
                i if i < 170 => (2, i - 170, -1),
                i if i < 213 => (2, i - 170, 1),
                i if i < white_edge => (3, i - 255, -1),
                _ => (3, 0, 0),
            };
            let k = i as usize;
            tables.level[k] = level;
            tables.three_eighths[k] = (3 * error + 4 * bias) / 8;
            tables.quarter[k] = (error + 2 * bias) / 4;
        }
        tables
    }
}

fn dither_two_bit_line(
    cur: &mut [u8],
    mut next: Option<&mut [u8]>,
    dst: &mut [u32],
    tables: &TwoBitTables,
) {
    let Some(last) = cur.len().checked_sub(1) else {
        return;
    };
    for j in 0..=last {
        let value = usize::from(cur[j]);
        set_field(dst, j, 2, u32::from(tables.level[value]));
        let three_eighths = tables.three_eighths[value];
        if three_eighths == 0 {
            continue;
        }
        if j < last {
            cur[j + 1] = spread(cur[j + 1], three_eighths);
        }
        if let Some(below) = next.as_deref_mut() {
            below[j] = spread(below[j], three_eighths);
            if j < last {
                below[j + 1] = spread(below[j + 1], tables.quarter[value]);
            }
        }
    }
}

/// Dithers 8 bpp gray to 2 bpp over the levels 0, 85, 170 and 255.
///
/// With `with_palette` the output carries a 4-entry linear gray palette.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] for palette-free input that is not 8 bpp
/// and [`Error::InvalidParameter`] if a clip exceeds 255
#[instrument(skip(raster), level = "trace")]
pub fn dither_to_2bpp(
    raster: &Raster,
    options: &DitherOptions,
    with_palette: bool,
) -> Result<Raster> {
    options.validate()?;
    let gray = eight_bit_input(raster)?;
    let tables = TwoBitTables::new(options.lower_clip, options.upper_clip);
    let mut out = gray.blank_like(Depth::Two)?;
    let height = gray.height() as usize;
    if height > 0 {
        let mut cur = gray.gray_row(0);
        for y in 0..height {
            let mut next = (y + 1 < height).then(|| gray.gray_row(y + 1));
            dither_two_bit_line(&mut cur, next.as_deref_mut(), out.line_mut(y), &tables);
            if let Some(next) = next {
                cur = next;
            }
        }
    }
    if with_palette {
        out.set_palette(Some(Palette::linear(Depth::Two, 4)?))?;
    }
    Ok(out)
}
