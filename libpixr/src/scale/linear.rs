//! Linear interpolation.
//!
//! The general path places each destination pixel in source coordinates with
//! 1/16 pixel precision and blends its four neighbors. Exact 2x and 4x
//! enlargements produce `factor` output lines from each pair of source lines
//! with fixed binomial weights, so the thresholded and dithered variants can
//! consume them one line at a time without building the gray enlargement.

use tracing::{instrument, trace};

use super::{
    filter_input, gray_rows, per_channel, scaled_output, scaled_size, write_gray_rows,
};
use crate::{
    convert::eight_bit_input,
    dither::{dither_binary_line, DitherOptions},
    raster::{bits::set_field, Depth, Raster},
    Error, Result,
};

/// Blends a source pair into `factor` output lines.
///
/// Output pixel `(m, k)` of the cell whose top-left source pixel is `v00`
/// (with `v01` to its right, `v10` below, `v11` diagonal) is
/// `((f-m)(f-k) v00 + m(f-k) v01 + (f-m)k v10 + mk v11) / f^2`.
fn expand_row_pair(top: &[u8], bottom: &[u8], factor: u32) -> Vec<Vec<u8>> {
    let shift = 2 * factor.trailing_zeros();
    let last = top.len().saturating_sub(1);
    (0..factor)
        .map(|k| {
            let mut line = Vec::with_capacity(top.len() * factor as usize);
            for j in 0..top.len() {
                let right = (j + 1).min(last);
                let (v00, v01) = (u32::from(top[j]), u32::from(top[right]));
                let (v10, v11) = (u32::from(bottom[j]), u32::from(bottom[right]));
                line.extend((0..factor).map(|m| {
                    let sum = (factor - m) * (factor - k) * v00
                        + m * (factor - k) * v01
                        + (factor - m) * k * v10
                        + m * k * v11;
                    // a weighted mean of bytes
                    (sum >> shift) as u8
                }));
            }
            line
        })
        .collect()
}

/// Streams the lines of an exact `factor` enlargement of an 8 bpp raster;
/// the last source row and column are replicated
fn enlarged_lines(gray: &Raster, factor: u32) -> impl Iterator<Item = Vec<u8>> + '_ {
    let height = gray.height() as usize;
    (0..height).flat_map(move |i| {
        let top = gray.gray_row(i);
        let bottom = if i + 1 < height {
            gray.gray_row(i + 1)
        } else {
            top.clone()
        };
        expand_row_pair(&top, &bottom, factor)
    })
}

fn enlarge_plane(gray: &Raster, factor: u32) -> Result<Raster> {
    let f = factor as f32;
    let (wd, hd) = scaled_size(gray, f, f)?;
    let mut out = scaled_output(gray, wd, hd, Depth::Eight, f64::from(f), f64::from(f))?;
    write_gray_rows(&mut out, enlarged_lines(gray, factor));
    trace!("enlarged {}x{} by {factor}", gray.width(), gray.height());
    Ok(out)
}

fn enlarge_gray(raster: &Raster, factor: u32) -> Result<Raster> {
    let gray = eight_bit_input(raster)?;
    enlarge_plane(&gray, factor)
}

/// General linear interpolation in 1/16 pixel fixed point
fn interpolate_plane(gray: &Raster, wd: u32, hd: u32, sx: f64, sy: f64) -> Result<Raster> {
    let (ws, hs) = gray.dimensions();
    let rows = gray_rows(gray);
    let mut out = scaled_output(gray, wd, hd, Depth::Eight, sx, sy)?;
    let scx = 16.0 * f64::from(ws) / f64::from(wd);
    let scy = 16.0 * f64::from(hs) / f64::from(hd);
    let (max_x, max_y) = (ws as usize - 1, hs as usize - 1);
    // source column and 1/16 fraction per destination column
    let cols: Vec<(usize, u32)> = (0..wd)
        .map(|j| {
            let xpm = (scx * f64::from(j)) as usize;
            ((xpm >> 4).min(max_x), (xpm & 0x0f) as u32)
        })
        .collect();
    for i in 0..hd {
        let ypm = (scy * f64::from(i)) as usize;
        let (yp, yf) = ((ypm >> 4).min(max_y), (ypm & 0x0f) as u32);
        let top = &rows[yp];
        let bottom = &rows[(yp + 1).min(max_y)];
        let line: Vec<u8> = cols
            .iter()
            .map(|&(xp, xf)| {
                let xn = (xp + 1).min(max_x);
                let (v00, v10) = (u32::from(top[xp]), u32::from(top[xn]));
                let (v01, v11) = (u32::from(bottom[xp]), u32::from(bottom[xn]));
                let sum = (16 - xf) * (16 - yf) * v00
                    + xf * (16 - yf) * v10
                    + (16 - xf) * yf * v01
                    + xf * yf * v11;
                ((sum + 128) / 256) as u8
            })
            .collect();
        out.set_gray_row(i as usize, &line);
    }
    Ok(out)
}

/// Scales 8 bpp gray or 32 bpp color by linear interpolation.
///
/// Palettes are removed and 2, 4 and 16 bpp are converted to gray first.
/// Exact `(2, 2)` and `(4, 4)` use the binomial enlargements of
/// [`scale_gray_2x_li`] and [`scale_gray_4x_li`], per channel for color.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] for 1 bpp input and
/// [`Error::InvalidParameter`] for unusable factors
#[allow(clippy::float_cmp)]
#[instrument(skip(raster), level = "trace")]
pub fn scale_li(raster: &Raster, sx: f32, sy: f32) -> Result<Raster> {
    let (wd, hd) = scaled_size(raster, sx, sy)?;
    let src = filter_input(raster)?;
    if sx == sy && (sx == 2.0 || sx == 4.0) {
        let factor = if sx == 2.0 { 2 } else { 4 };
        return per_channel(&src, |plane| enlarge_plane(plane, factor));
    }
    per_channel(&src, |plane| {
        interpolate_plane(plane, wd, hd, f64::from(sx), f64::from(sy))
    })
}

/// Enlarges 8 bpp gray exactly 2x with linear interpolation
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] unless the input is 8 bpp (or palette
/// indexed) and [`Error::InvalidParameter`] for an empty raster
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_2x_li(raster: &Raster) -> Result<Raster> {
    enlarge_gray(raster, 2)
}

/// Enlarges 8 bpp gray exactly 4x with linear interpolation
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] unless the input is 8 bpp (or palette
/// indexed) and [`Error::InvalidParameter`] for an empty raster
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_4x_li(raster: &Raster) -> Result<Raster> {
    enlarge_gray(raster, 4)
}

fn enlarge_thresh(raster: &Raster, factor: u32, thresh: u32) -> Result<Raster> {
    if thresh > 255 {
        return Err(Error::invalid("thresh", format!("{thresh} > 255")));
    }
    let gray = eight_bit_input(raster)?;
    let f = factor as f32;
    let (wd, hd) = scaled_size(&gray, f, f)?;
    let mut out = scaled_output(&gray, wd, hd, Depth::One, f64::from(f), f64::from(f))?;
    for (y, line) in enlarged_lines(&gray, factor).enumerate() {
        let dst = out.line_mut(y);
        for (x, &v) in line.iter().enumerate() {
            if u32::from(v) < thresh {
                set_field(dst, x, 1, 1);
            }
        }
    }
    Ok(out)
}

fn enlarge_dither(raster: &Raster, factor: u32) -> Result<Raster> {
    let gray = eight_bit_input(raster)?;
    let f = factor as f32;
    let (wd, hd) = scaled_size(&gray, f, f)?;
    let mut out = scaled_output(&gray, wd, hd, Depth::One, f64::from(f), f64::from(f))?;
    let options = DitherOptions::default();
    let mut lines = enlarged_lines(&gray, factor);
    let mut cur = lines.next();
    let mut y = 0;
    while let Some(mut line) = cur {
        let mut next = lines.next();
        dither_binary_line(&mut line, next.as_deref_mut(), out.line_mut(y), &options);
        cur = next;
        y += 1;
    }
    Ok(out)
}

/// Enlarges 8 bpp gray 2x and thresholds to 1 bpp (below `thresh` is ON),
/// one interpolated line at a time
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `thresh > 255` and
/// [`Error::InvalidDepth`] unless the input is 8 bpp
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_2x_li_thresh(raster: &Raster, thresh: u32) -> Result<Raster> {
    enlarge_thresh(raster, 2, thresh)
}

/// Enlarges 8 bpp gray 4x and thresholds to 1 bpp, see [`scale_gray_2x_li_thresh`]
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `thresh > 255` and
/// [`Error::InvalidDepth`] unless the input is 8 bpp
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_4x_li_thresh(raster: &Raster, thresh: u32) -> Result<Raster> {
    enlarge_thresh(raster, 4, thresh)
}

/// Enlarges 8 bpp gray 2x and dithers to 1 bpp with the default clips,
/// carrying the diffusion error from one interpolated line to the next
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] unless the input is 8 bpp
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_2x_li_dither(raster: &Raster) -> Result<Raster> {
    enlarge_dither(raster, 2)
}

/// Enlarges 8 bpp gray 4x and dithers to 1 bpp, see [`scale_gray_2x_li_dither`]
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] unless the input is 8 bpp
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_4x_li_dither(raster: &Raster) -> Result<Raster> {
    enlarge_dither(raster, 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{convert::threshold_to_binary, dither::dither_to_binary, Rgb};

    fn ramp(width: u32, height: u32) -> Raster {
        let bytes: Vec<u8> = (0..width * height)
            .map(|i| ((i % width) * 255 / (width - 1)) as u8)
            .collect();
        Raster::from_gray_bytes(width, height, &bytes).unwrap()
    }

    #[test]
    fn flat_gray_stays_flat() {
        let r = Raster::from_gray_bytes(4, 4, &[128; 16]).unwrap();
        let out = scale_li(&r, 2.0, 2.0).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert!(out.pixels().all(|(_, _, v)| v == 128));
        let out = scale_li(&r, 1.7, 0.9).unwrap();
        assert_eq!(out.dimensions(), (7, 4));
        assert!(out.pixels().all(|(_, _, v)| v == 128));
    }

    #[test]
    fn binomial_weights() {
        let r = Raster::from_gray_bytes(2, 2, &[0, 100, 200, 40]).unwrap();
        let out = scale_gray_2x_li(&r).unwrap();
        assert_eq!(out.gray_row(0), vec![0, 50, 100, 100]);
        assert_eq!(out.gray_row(1), vec![100, 85, 70, 70]);
        assert_eq!(out.gray_row(3), vec![200, 120, 40, 40]);

        let out = scale_gray_4x_li(&r).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.gray_row(0)[..4], [0, 25, 50, 75]);
        // (9 * 0 + 3 * 100 + 3 * 200 + 40) / 16
        assert_eq!(out.get_pixel(1, 1).unwrap(), 58);
    }

    #[test]
    fn exact_factors_use_the_binomial_path() {
        let r = ramp(5, 3);
        assert_eq!(scale_li(&r, 2.0, 2.0).unwrap(), scale_gray_2x_li(&r).unwrap());
        assert_eq!(scale_li(&r, 4.0, 4.0).unwrap(), scale_gray_4x_li(&r).unwrap());
    }

    #[test]
    fn general_path_interpolates() {
        let r = Raster::from_gray_bytes(2, 1, &[0, 160]).unwrap();
        let out = scale_li(&r, 4.0, 1.0).unwrap();
        // positions 0, 1/4, 1/2, 3/4, 1, ... in source pixels
        assert_eq!(out.gray_row(0), vec![0, 40, 80, 120, 160, 160, 160, 160]);
        let out = scale_li(&ramp(16, 2), 0.8, 1.0).unwrap();
        let row = out.gray_row(0);
        assert!(row.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn color_goes_channel_by_channel() {
        let r = Raster::from_rgb_bytes(2, 1, &[0, 100, 200, 200, 100, 0]).unwrap();
        let out = scale_li(&r, 2.0, 2.0).unwrap();
        assert_eq!(out.depth(), Depth::ThirtyTwo);
        assert_eq!(out.get_rgb(1, 1).unwrap(), Rgb::new(100, 100, 100));
        assert_eq!(out.get_rgb(3, 0).unwrap(), Rgb::new(200, 100, 0));
    }

    #[test]
    fn depth_handling() {
        let binary = Raster::new(4, 4, Depth::One).unwrap();
        assert_eq!(scale_li(&binary, 2.0, 2.0), Err(Error::InvalidDepth(1)));
        let mut four = Raster::new(2, 2, Depth::Four).unwrap();
        four.set_pixel(0, 0, 15).unwrap();
        let out = scale_li(&four, 3.0, 3.0).unwrap();
        assert_eq!(out.depth(), Depth::Eight);
        assert_eq!(out.get_pixel(0, 0).unwrap(), 255);
        let rgb = Raster::new(2, 2, Depth::ThirtyTwo).unwrap();
        assert_eq!(scale_gray_2x_li(&rgb), Err(Error::InvalidDepth(32)));
    }

    #[test]
    fn streamed_threshold_matches_two_steps() {
        let r = ramp(9, 4);
        for (factor, thresh) in [(2, 100), (4, 180)] {
            let streamed = if factor == 2 {
                scale_gray_2x_li_thresh(&r, thresh).unwrap()
            } else {
                scale_gray_4x_li_thresh(&r, thresh).unwrap()
            };
            let gray = if factor == 2 {
                scale_gray_2x_li(&r).unwrap()
            } else {
                scale_gray_4x_li(&r).unwrap()
            };
            assert_eq!(streamed, threshold_to_binary(&gray, thresh).unwrap());
        }
        assert!(scale_gray_2x_li_thresh(&r, 300).is_err());
    }

    #[test]
    fn streamed_dither_matches_two_steps() {
        let r = ramp(11, 5);
        let options = DitherOptions::default();
        assert_eq!(
            scale_gray_2x_li_dither(&r).unwrap(),
            dither_to_binary(&scale_gray_2x_li(&r).unwrap(), &options).unwrap()
        );
        assert_eq!(
            scale_gray_4x_li_dither(&r).unwrap(),
            dither_to_binary(&scale_gray_4x_li(&r).unwrap(), &options).unwrap()
        );
    }
}
