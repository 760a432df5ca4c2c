use tracing::{instrument, trace};

use super::{scaled_output, scaled_size};
use crate::{
    raster::{
        bits::{get_field, set_field},
        Depth, Raster,
    },
    Error, Result,
};

/// Nearest source index for each of `dst` destination positions:
/// `min(round(i * src / dst), src - 1)`
fn sample_indices(src: u32, dst: u32) -> Vec<usize> {
    let ratio = f64::from(src) / f64::from(dst);
    let last = src as usize - 1;
    (0..dst)
        .map(|i| ((ratio * f64::from(i) + 0.5) as usize).min(last))
        .collect()
}

/// Scales by nearest-neighbor sampling at any depth. Values are copied, never
/// blended, so a palette is carried over unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for unusable factors
#[instrument(skip(raster), level = "trace")]
pub fn scale_by_sampling(raster: &Raster, sx: f32, sy: f32) -> Result<Raster> {
    let (wd, hd) = scaled_size(raster, sx, sy)?;
    let depth = raster.depth();
    let mut out = scaled_output(raster, wd, hd, depth, f64::from(sx), f64::from(sy))?;
    out.set_palette(raster.palette().cloned())?;
    let rows = sample_indices(raster.height(), hd);
    let cols = sample_indices(raster.width(), wd);
    let bits = depth.bits();
    let wpl = out.wpl();
    let mut prev_row = None;
    for (i, &src_y) in rows.iter().enumerate() {
        if prev_row == Some(src_y) {
            out.data_mut().copy_within((i - 1) * wpl..i * wpl, i * wpl);
            continue;
        }
        prev_row = Some(src_y);
        let src = raster.line(src_y);
        let dst = out.line_mut(i);
        let mut prev_col = None;
        let mut value = 0;
        for (j, &src_x) in cols.iter().enumerate() {
            if prev_col != Some(src_x) {
                value = get_field(src, src_x, bits);
                prev_col = Some(src_x);
            }
            set_field(dst, j, bits, value);
        }
    }
    trace!("sampled {}x{} to {wd}x{hd}", raster.width(), raster.height());
    Ok(out)
}

/// Scales a 1 bpp raster by sampling. Only ON pixels are written, and runs
/// of destination pixels that share a source column reuse one lookup.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] if the raster is not 1 bpp and
/// [`Error::InvalidParameter`] for unusable factors
#[instrument(skip(raster), level = "trace")]
pub fn scale_binary(raster: &Raster, sx: f32, sy: f32) -> Result<Raster> {
    if raster.depth() != Depth::One {
        return Err(Error::InvalidDepth(raster.depth().bits()));
    }
    let (wd, hd) = scaled_size(raster, sx, sy)?;
    let mut out = scaled_output(raster, wd, hd, Depth::One, f64::from(sx), f64::from(sy))?;
    out.set_palette(raster.palette().cloned())?;
    let rows = sample_indices(raster.height(), hd);
    let cols = sample_indices(raster.width(), wd);
    let wpl = out.wpl();
    for (i, &src_y) in rows.iter().enumerate() {
        if i > 0 && rows[i - 1] == src_y {
            out.data_mut().copy_within((i - 1) * wpl..i * wpl, i * wpl);
            continue;
        }
        let src = raster.line(src_y);
        // a blank source row leaves the zeroed line as is
        if src.iter().all(|&w| w == 0) {
            continue;
        }
        let dst = out.line_mut(i);
        let mut j = 0;
        while j < cols.len() {
            let src_x = cols[j];
            let run = cols[j..].iter().take_while(|&&c| c == src_x).count();
            if get_field(src, src_x, 1) == 1 {
                for k in j..j + run {
                    set_field(dst, k, 1, 1);
                }
            }
            j += run;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn indices_round_and_clamp() {
        assert_eq!(sample_indices(4, 8), vec![0, 1, 1, 2, 2, 3, 3, 3]);
        assert_eq!(sample_indices(8, 4), vec![0, 2, 4, 6]);
        assert_eq!(sample_indices(3, 3), vec![0, 1, 2]);
    }

    #[test]
    fn sampling_copies_values_and_palette() {
        let mut r = Raster::new(3, 2, Depth::Four).unwrap();
        for (x, y, v) in [(0, 0, 1), (1, 0, 2), (2, 0, 3), (0, 1, 9), (2, 1, 15)] {
            r.set_pixel(x, y, v).unwrap();
        }
        r.set_palette(Some(Palette::linear(Depth::Four, 16).unwrap()))
            .unwrap();
        let out = scale_by_sampling(&r, 2.0, 2.0).unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        assert_eq!(out.palette(), r.palette());
        for (x, y, v) in out.pixels() {
            let src_x = sample_indices(3, 6)[x as usize] as u32;
            let src_y = sample_indices(2, 4)[y as usize] as u32;
            let src = r.get_pixel(src_x, src_y).unwrap();
            assert_eq!(v, src, "({x}, {y})");
        }
    }

    #[test]
    fn sampling_every_depth() {
        for depth in [Depth::One, Depth::Two, Depth::Eight, Depth::Sixteen, Depth::ThirtyTwo] {
            let mut r = Raster::new(5, 5, depth).unwrap();
            r.set_pixel(3, 4, 1).unwrap();
            let out = scale_by_sampling(&r, 0.6, 1.4).unwrap();
            assert_eq!(out.dimensions(), (3, 7));
            // source row 4 feeds output rows 5 and 6
            assert_eq!(out.get_pixel(2, 5).unwrap(), 1);
            assert_eq!(out.get_pixel(2, 6).unwrap(), 1);
            assert_eq!(out.pixels().filter(|&(_, _, v)| v != 0).count(), 2);
        }
    }

    #[test]
    fn binary_matches_sampling() {
        let mut r = Raster::new(37, 11, Depth::One).unwrap();
        for y in 0..11 {
            for x in 0..37 {
                if (x * 7 + y * 3) % 5 == 0 {
                    r.set_pixel(x, y, 1).unwrap();
                }
            }
        }
        for (sx, sy) in [(2.0, 2.0), (0.5, 0.5), (1.3, 0.7), (3.0, 1.0)] {
            assert_eq!(
                scale_binary(&r, sx, sy).unwrap(),
                scale_by_sampling(&r, sx, sy).unwrap(),
                "({sx}, {sy})"
            );
        }
        let gray = Raster::new(2, 2, Depth::Eight).unwrap();
        assert_eq!(scale_binary(&gray, 2.0, 2.0), Err(Error::InvalidDepth(8)));
    }
}
