use tracing::{instrument, warn};

use super::{filter_input, gray_rows, per_channel, scale_li, scaled_output, scaled_size};
use crate::{
    raster::{Depth, Raster},
    Error, Result,
};

fn halve_plane(gray: &Raster) -> Result<Raster> {
    let (wd, hd) = (gray.width() / 2, gray.height() / 2);
    let mut out = scaled_output(gray, wd, hd, Depth::Eight, 0.5, 0.5)?;
    for i in 0..hd as usize {
        let (top, bottom) = (gray.gray_row(2 * i), gray.gray_row(2 * i + 1));
        let line: Vec<u8> = (0..wd as usize)
            .map(|j| {
                let sum = u32::from(top[2 * j])
                    + u32::from(top[2 * j + 1])
                    + u32::from(bottom[2 * j])
                    + u32::from(bottom[2 * j + 1]);
                (sum >> 2) as u8
            })
            .collect();
        out.set_gray_row(i, &line);
    }
    Ok(out)
}

/// Reduces by exactly 2x, averaging each 2x2 block: `(a + b + c + d) >> 2`.
/// The output is `w/2 x h/2`; an odd last row or column is dropped.
///
/// Works on 8 bpp gray and 32 bpp color; palettes are removed and 2, 4 and
/// 16 bpp are converted to gray first.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] for 1 bpp and
/// [`Error::InvalidParameter`] if either side is shorter than 2
#[instrument(skip(raster), level = "trace")]
pub fn scale_area_map_2(raster: &Raster) -> Result<Raster> {
    if raster.width() < 2 || raster.height() < 2 {
        return Err(Error::invalid(
            "raster",
            format!("{}x{} is too small to halve", raster.width(), raster.height()),
        ));
    }
    let src = filter_input(raster)?;
    per_channel(&src, halve_plane)
}

/// Position in 1/16 pixels split into the whole pixel and the fraction
const fn split_sixteenths(pos: usize) -> (usize, u64) {
    (pos >> 4, (pos & 0x0f) as u64)
}

fn area_map_plane(gray: &Raster, wd: u32, hd: u32, sx: f64, sy: f64) -> Result<Raster> {
    let (ws, hs) = gray.dimensions();
    let rows = gray_rows(gray);
    let mut out = scaled_output(gray, wd, hd, Depth::Eight, sx, sy)?;
    let scx = 16.0 * f64::from(ws) / f64::from(wd);
    let scy = 16.0 * f64::from(hs) / f64::from(hd);
    // a cell may cover far more than 256x256 source pixels
    let px = |r: usize, c: usize| u64::from(rows[r][c]);
    for i in 0..hd {
        let (yup, yuf) = split_sixteenths((scy * f64::from(i)) as usize);
        let (ylp, ylf) = split_sixteenths((scy * f64::from(i + 1)) as usize);
        let dely = ylp - yup;
        let line: Vec<u8> = (0..wd)
            .map(|j| {
                let (xup, xuf) = split_sixteenths((scx * f64::from(j)) as usize);
                let (xlp, xlf) = split_sixteenths((scx * f64::from(j + 1)) as usize);
                let delx = xlp - xup;
                // near the far edges the covered area runs off the source
                if xlp + 2 > ws as usize || ylp + 2 > hs as usize {
                    return rows[yup.min(hs as usize - 1)][xup.min(ws as usize - 1)];
                }
                let (xuw, yuw) = (16 - xuf, 16 - yuf);
                let width = xuw + 16 * (delx as u64 - 1) + xlf;
                let height = yuw + 16 * (dely as u64 - 1) + ylf;
                let corners = xuw * yuw * px(yup, xup)
                    + xlf * yuw * px(yup, xlp)
                    + xuw * ylf * px(ylp, xup)
                    + xlf * ylf * px(ylp, xlp);
                let inner: u64 = (1..dely)
                    .flat_map(|k| (1..delx).map(move |m| (k, m)))
                    .map(|(k, m)| 256 * px(yup + k, xup + m))
                    .sum();
                let left_right: u64 = (1..dely)
                    .map(|k| 16 * (xuw * px(yup + k, xup) + xlf * px(yup + k, xlp)))
                    .sum();
                let top_bottom: u64 = (1..delx)
                    .map(|m| 16 * (yuw * px(yup, xup + m) + ylf * px(ylp, xup + m)))
                    .sum();
                let total = corners + inner + left_right + top_bottom;
                let mean = (total + 128) / (width * height);
                u8::try_from(mean).unwrap_or(u8::MAX)
            })
            .collect();
        out.set_gray_row(i as usize, &line);
    }
    Ok(out)
}

/// Reduces by area mapping: each destination pixel is the mean of the source
/// area it covers, weighted to 1/16 pixel at the boundaries.
///
/// `(0.5, 0.5)` goes to [`scale_area_map_2`]. A factor of 0.7 or more on
/// either axis is not a reduction this method suits; it is logged and
/// handed to [`scale_li`].
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] for 1 bpp and
/// [`Error::InvalidParameter`] for unusable factors
#[allow(clippy::float_cmp)]
#[instrument(skip(raster), level = "trace")]
pub fn scale_area_map(raster: &Raster, sx: f32, sy: f32) -> Result<Raster> {
    let (wd, hd) = scaled_size(raster, sx, sy)?;
    if sx >= 0.7 || sy >= 0.7 {
        warn!("area map requested for ({sx}, {sy}); using linear interpolation");
        return scale_li(raster, sx, sy);
    }
    if sx == 0.5 && sy == 0.5 {
        return scale_area_map_2(raster);
    }
    let src = filter_input(raster)?;
    per_channel(&src, |plane| {
        area_map_plane(plane, wd, hd, f64::from(sx), f64::from(sy))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scale::scale, Rgb};

    #[test]
    fn halving_averages_blocks() {
        let r = Raster::from_gray_bytes(5, 3, &[
            0, 4, 10, 20, 99, //
            8, 4, 30, 40, 99, //
            99, 99, 99, 99, 99,
        ])
        .unwrap();
        let out = scale_area_map_2(&r).unwrap();
        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.gray_row(0), vec![4, 25]);
        assert!(scale_area_map_2(&Raster::new(1, 8, Depth::Eight).unwrap()).is_err());
    }

    #[test]
    fn halving_color_and_resolution() {
        let mut r = Raster::from_rgb_bytes(2, 2, &[
            10, 0, 255, 20, 0, 255, //
            30, 0, 255, 40, 0, 255,
        ])
        .unwrap();
        r.set_resolution(300, 300);
        let out = scale_area_map_2(&r).unwrap();
        assert_eq!(out.get_rgb(0, 0).unwrap(), Rgb::new(25, 0, 255));
        assert_eq!(out.resolution(), (150, 150));
    }

    #[test]
    fn flat_areas_keep_their_value() {
        let r = Raster::from_gray_bytes(40, 30, &[77; 1200]).unwrap();
        for (sx, sy) in [(0.3, 0.3), (0.25, 0.6), (0.13, 0.42)] {
            let out = scale_area_map(&r, sx, sy).unwrap();
            assert!(out.pixels().all(|(_, _, v)| v == 77), "({sx}, {sy})");
        }
    }

    #[test]
    fn area_map_averages() {
        // alternating columns of 0 and 200 average out to 100 away from the edges
        let bytes: Vec<u8> = (0..32 * 32).map(|i| if i % 2 == 0 { 0 } else { 200 }).collect();
        let r = Raster::from_gray_bytes(32, 32, &bytes).unwrap();
        let out = scale_area_map(&r, 0.25, 0.25).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(3, 3).unwrap(), 100);
    }

    #[test]
    fn very_small_factors_keep_flat_values() {
        let r = Raster::from_gray_bytes(600, 600, &[255; 600 * 600]).unwrap();
        let out = scale_area_map(&r, 0.003, 0.003).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert!(out.pixels().all(|(_, _, v)| v == 255), "{:?}", out.gray_row(0));
        let out = scale(&r, 0.005, 0.005).unwrap();
        assert_eq!(out.dimensions(), (3, 3));
        assert!(out.pixels().all(|(_, _, v)| v == 255));
    }

    #[test]
    fn dispatches_special_factors() {
        let bytes: Vec<u8> = (0..=255).collect();
        let r = Raster::from_gray_bytes(16, 16, &bytes).unwrap();
        assert_eq!(scale_area_map(&r, 0.5, 0.5).unwrap(), scale_area_map_2(&r).unwrap());
        assert_eq!(scale_area_map(&r, 0.9, 0.3).unwrap(), scale_li(&r, 0.9, 0.3).unwrap());
        let binary = Raster::new(8, 8, Depth::One).unwrap();
        assert_eq!(scale_area_map(&binary, 0.3, 0.3), Err(Error::InvalidDepth(1)));
    }
}
