//! Every scaling operation borrows its input and returns a new raster. Factor
//! scaling follows one size law: a `w x h` source scaled by `(sx, sy)` becomes
//! `round(sx * w) x round(sy * h)`. Resolution metadata is scaled with the
//! image.
//!
//! The filtering scalers (linear interpolation, area mapping, mipmaps) work on
//! 8 bpp gray. 32 bpp color is handled one channel at a time through the same
//! gray code, which gives the same result as filtering packed pixels.

mod area;
mod linear;
mod mipmap;
mod rank;
mod sampling;

use std::borrow::Cow;

use tracing::{debug, instrument};

pub use area::{scale_area_map, scale_area_map_2};
pub use linear::{
    scale_gray_2x_li, scale_gray_2x_li_dither, scale_gray_2x_li_thresh, scale_gray_4x_li,
    scale_gray_4x_li_dither, scale_gray_4x_li_thresh, scale_li,
};
pub use mipmap::scale_mipmap;
pub use rank::{
    scale_gray_min_max, scale_gray_min_max_2, scale_gray_rank_2, scale_gray_rank_cascade,
    MinMaxKind,
};
pub use sampling::{scale_binary, scale_by_sampling};

use crate::{
    convert::{convert_to_gray, remove_palette, PaletteTarget},
    raster::{compose_rgb, extract_rgb, Depth, Raster},
    Error, Result,
};

fn check_factor(name: &'static str, factor: f32) -> Result<()> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(name, format!("{factor} is not a positive factor")))
    }
}

fn scaled_extent(name: &'static str, extent: u32, factor: f32) -> Result<u32> {
    let scaled = (f64::from(factor) * f64::from(extent)).round();
    if scaled < 1.0 || scaled > f64::from(u32::MAX) {
        return Err(Error::invalid(
            name,
            format!("scaling {extent} by {factor} gives an unusable size"),
        ));
    }
    // in range per the check above
    Ok(scaled as u32)
}

/// Output size for scaling `raster` by `(sx, sy)`
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for a factor that is not finite and
/// positive, an empty source, or an empty result
pub(crate) fn scaled_size(raster: &Raster, sx: f32, sy: f32) -> Result<(u32, u32)> {
    check_factor("sx", sx)?;
    check_factor("sy", sy)?;
    if raster.width() == 0 || raster.height() == 0 {
        return Err(Error::invalid("raster", "cannot scale an empty raster"));
    }
    Ok((
        scaled_extent("sx", raster.width(), sx)?,
        scaled_extent("sy", raster.height(), sy)?,
    ))
}

/// Zeroed output raster whose resolution is the source's scaled by `(sx, sy)`
pub(crate) fn scaled_output(
    src: &Raster,
    width: u32,
    height: u32,
    depth: Depth,
    sx: f64,
    sy: f64,
) -> Result<Raster> {
    let mut out = src.blank_sized(width, height, depth)?;
    let (xres, yres) = src.resolution();
    let scale = |res: u32, f: f64| (f64::from(res) * f).round() as u32;
    out.set_resolution(scale(xres, sx), scale(yres, sy));
    Ok(out)
}

/// Reads every row of an 8 bpp raster
pub(crate) fn gray_rows(raster: &Raster) -> Vec<Vec<u8>> {
    (0..raster.height() as usize)
        .map(|y| raster.gray_row(y))
        .collect()
}

/// Writes rows into an 8 bpp raster, top to bottom
pub(crate) fn write_gray_rows(raster: &mut Raster, rows: impl IntoIterator<Item = Vec<u8>>) {
    for (y, row) in rows.into_iter().enumerate() {
        raster.set_gray_row(y, &row);
    }
}

/// Splits 32 bpp RGB into red, green and blue 8 bpp planes
pub(crate) fn split_channels(raster: &Raster) -> Result<[Raster; 3]> {
    let mut planes = [
        raster.blank_like(Depth::Eight)?,
        raster.blank_like(Depth::Eight)?,
        raster.blank_like(Depth::Eight)?,
    ];
    for y in 0..raster.height() as usize {
        let (reds, (greens, blues)): (Vec<u8>, (Vec<u8>, Vec<u8>)) = raster
            .line(y)
            .iter()
            .map(|&p| {
                let c = extract_rgb(p);
                (c.red, (c.green, c.blue))
            })
            .unzip();
        planes[0].set_gray_row(y, &reds);
        planes[1].set_gray_row(y, &greens);
        planes[2].set_gray_row(y, &blues);
    }
    Ok(planes)
}

pub(crate) fn merge_channels([red, green, blue]: &[Raster; 3]) -> Result<Raster> {
    let mut out = red.blank_like(Depth::ThirtyTwo)?;
    for y in 0..red.height() as usize {
        let (r, g, b) = (red.gray_row(y), green.gray_row(y), blue.gray_row(y));
        for (x, word) in out.line_mut(y).iter_mut().enumerate() {
            *word = compose_rgb(r[x], g[x], b[x]);
        }
    }
    Ok(out)
}

/// Applies a gray operation to an 8 bpp raster, or to each channel of a
/// 32 bpp raster
pub(crate) fn per_channel(
    raster: &Raster,
    op: impl Fn(&Raster) -> Result<Raster>,
) -> Result<Raster> {
    if raster.depth() == Depth::ThirtyTwo {
        let [r, g, b] = split_channels(raster)?;
        merge_channels(&[op(&r)?, op(&g)?, op(&b)?])
    } else {
        op(raster)
    }
}

/// Brings a raster to 8 bpp gray or 32 bpp color for filtering: palettes are
/// removed, 2, 4 and 16 bpp become gray. 1 bpp without a palette is rejected.
pub(crate) fn filter_input(raster: &Raster) -> Result<Cow<'_, Raster>> {
    if raster.palette().is_some() {
        let removed = remove_palette(raster, PaletteTarget::Auto)?;
        return Ok(Cow::Owned(if removed.depth() == Depth::One {
            convert_to_gray(&removed)?
        } else {
            removed
        }));
    }
    match raster.depth() {
        Depth::One => Err(Error::InvalidDepth(1)),
        Depth::Eight | Depth::ThirtyTwo => Ok(Cow::Borrowed(raster)),
        _ => convert_to_gray(raster).map(Cow::Owned),
    }
}

/// Scales by `(sx, sy)` with the method that suits the input.
///
/// - `(1, 1)` returns a copy
/// - 1 bpp uses [`scale_binary`] (a 1 bpp palette is removed first)
/// - reductions below 0.7 on both axes use [`scale_area_map`]
/// - everything else uses [`scale_li`]
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for unusable factors, see the module docs
#[allow(clippy::float_cmp)]
#[instrument(skip(raster), level = "trace")]
pub fn scale(raster: &Raster, sx: f32, sy: f32) -> Result<Raster> {
    scaled_size(raster, sx, sy)?;
    if sx == 1.0 && sy == 1.0 {
        debug!("unit scale; copying");
        return Ok(raster.clone());
    }
    let src = if raster.palette().is_some() {
        Cow::Owned(remove_palette(raster, PaletteTarget::Auto)?)
    } else {
        Cow::Borrowed(raster)
    };
    if src.depth() == Depth::One {
        debug!("binary input; sampling");
        return scale_binary(&src, sx, sy);
    }
    if sx < 0.7 && sy < 0.7 {
        debug!("reduction by ({sx}, {sy}); area mapping");
        scale_area_map(&src, sx, sy)
    } else {
        debug!("scale by ({sx}, {sy}); linear interpolation");
        scale_li(&src, sx, sy)
    }
}

/// Scales to `width x height` with [`scale`]. If one of the two is 0 it is
/// chosen to keep the aspect ratio.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if both sizes are 0 or the raster is empty
#[instrument(skip(raster), level = "trace")]
pub fn scale_to_size(raster: &Raster, width: u32, height: u32) -> Result<Raster> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(Error::invalid("raster", "cannot scale an empty raster"));
    }
    let factor = |target: u32, extent: u32| (f64::from(target) / f64::from(extent)) as f32;
    let (sx, sy) = match (width, height) {
        (0, 0) => return Err(Error::invalid("width", "width and height are both 0")),
        (0, h) => {
            let s = factor(h, raster.height());
            (s, s)
        }
        (w, 0) => {
            let s = factor(w, raster.width());
            (s, s)
        }
        (w, h) => (factor(w, raster.width()), factor(h, raster.height())),
    };
    scale(raster, sx, sy)
}
