use tracing::{instrument, trace};

use super::{gray_rows, merge_channels, scaled_output, split_channels};
use crate::{
    raster::{Depth, Raster},
    Error, Result,
};

fn check_inputs(full: &Raster, half: &Raster, scale: f32) -> Result<()> {
    if !(0.5..=1.0).contains(&scale) {
        return Err(Error::invalid("scale", format!("{scale} is outside [0.5, 1.0]")));
    }
    if !matches!(full.depth(), Depth::Eight | Depth::ThirtyTwo) {
        return Err(Error::InvalidDepth(full.depth().bits()));
    }
    if half.depth() != full.depth() {
        return Err(Error::InvalidDepth(half.depth().bits()));
    }
    if full.palette().is_some() || half.palette().is_some() {
        return Err(Error::invalid("palette", "mipmap inputs must not carry a palette"));
    }
    let (w1, h1) = full.dimensions();
    let (w2, h2) = half.dimensions();
    if w2 == 0 || h2 == 0 || w1 < 2 * w2 || h1 < 2 * h2 {
        return Err(Error::DimensionMismatch {
            expected: (2 * w2 as usize, 2 * h2 as usize),
            found: (w1 as usize, h1 as usize),
        });
    }
    Ok(())
}

/// Source position in the half-size image for each destination position
fn half_indices(dst: u32, ratio: f64, extent: u32) -> Vec<usize> {
    let last = extent as usize - 1;
    (0..dst)
        .map(|i| ((ratio * f64::from(i) + 0.5) as usize).min(last))
        .collect()
}

fn blend_planes(full: &Raster, half: &Raster, scale: f32, wd: u32, hd: u32) -> Result<Raster> {
    let scale = f64::from(scale);
    let mut out = scaled_output(full, wd, hd, Depth::Eight, scale, scale)?;
    let ratio = 1.0 / (2.0 * scale);
    let rows = half_indices(hd, ratio, half.height());
    let cols = half_indices(wd, ratio, half.width());
    let weight_full = 2.0 * scale - 1.0;
    let weight_half = 1.0 - weight_full;
    let (full_rows, half_rows) = (gray_rows(full), gray_rows(half));
    for (i, &iy) in rows.iter().enumerate() {
        let (line1, line2) = (&full_rows[2 * iy], &half_rows[iy]);
        let line: Vec<u8> = cols
            .iter()
            .map(|&ix| {
                let v = weight_full * f64::from(line1[2 * ix]) + weight_half * f64::from(line2[ix]);
                v.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        out.set_gray_row(i, &line);
    }
    Ok(out)
}

/// Blends a full-size image with its 2x reduction to approximate a reduction
/// by `scale` in `[0.5, 1.0]`.
///
/// `half` must be at most half the size of `full` on each axis. The output is
/// `trunc(scale * w) x trunc(scale * h)` of `full`, and each pixel is
/// `w1 * full + (1 - w1) * half` with `w1 = 2 * scale - 1`.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] unless both inputs are 8 bpp or both are
/// 32 bpp, [`Error::InvalidParameter`] for a palette or a scale outside
/// `[0.5, 1.0]`, and [`Error::DimensionMismatch`] if `half` is too large
#[instrument(skip(full, half), level = "trace")]
pub fn scale_mipmap(full: &Raster, half: &Raster, scale: f32) -> Result<Raster> {
    check_inputs(full, half, scale)?;
    let s = f64::from(scale);
    // truncation toward zero, both values are positive
    let wd = (s * f64::from(full.width())) as u32;
    let hd = (s * f64::from(full.height())) as u32;
    if wd == 0 || hd == 0 {
        return Err(Error::invalid("scale", "the blend would be empty"));
    }
    trace!("blending to {wd}x{hd}");
    if full.depth() == Depth::ThirtyTwo {
        let (fulls, halves) = (split_channels(full)?, split_channels(half)?);
        let [r, g, b] = [0, 1, 2].map(|c| blend_planes(&fulls[c], &halves[c], scale, wd, hd));
        return merge_channels(&[r?, g?, b?]);
    }
    blend_planes(full, half, scale, wd, hd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scale::scale_area_map_2, Palette, Rgb};

    fn flat(width: u32, height: u32, value: u8) -> Raster {
        let bytes = vec![value; (width * height) as usize];
        Raster::from_gray_bytes(width, height, &bytes).unwrap()
    }

    #[test]
    fn blend_weights_follow_scale() {
        let (full, half) = (flat(8, 6, 200), flat(4, 3, 100));
        let out = scale_mipmap(&full, &half, 1.0).unwrap();
        assert_eq!(out.dimensions(), (8, 6));
        assert!(out.pixels().all(|(_, _, v)| v == 200));
        let out = scale_mipmap(&full, &half, 0.5).unwrap();
        assert_eq!(out.dimensions(), (4, 3));
        assert!(out.pixels().all(|(_, _, v)| v == 100));
        let out = scale_mipmap(&full, &half, 0.75).unwrap();
        // 0.75 * 8 = 6, 0.75 * 6 = 4.5 truncated
        assert_eq!(out.dimensions(), (6, 4));
        assert!(out.pixels().all(|(_, _, v)| v == 150));
    }

    #[test]
    fn blends_a_real_reduction() {
        let bytes: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
        let full = Raster::from_gray_bytes(8, 8, &bytes).unwrap();
        let half = scale_area_map_2(&full).unwrap();
        let out = scale_mipmap(&full, &half, 0.6).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        for y in 0..4 {
            let row = out.gray_row(y);
            assert!(row.windows(2).all(|w| w[0] <= w[1]), "row {y}: {row:?}");
        }
    }

    #[test]
    fn color_blends_per_channel() {
        let full = Raster::from_rgb_bytes(2, 2, &[10, 20, 30].repeat(4)).unwrap();
        let half = Raster::from_rgb_bytes(1, 1, &[30, 40, 50]).unwrap();
        let out = scale_mipmap(&full, &half, 0.75).unwrap();
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.get_rgb(0, 0).unwrap(), Rgb::new(20, 30, 40));
    }

    #[test]
    fn inputs_are_validated() {
        let (full, half) = (flat(8, 6, 1), flat(4, 3, 1));
        assert!(matches!(
            scale_mipmap(&full, &half, 0.4),
            Err(Error::InvalidParameter { name: "scale", .. })
        ));
        assert!(scale_mipmap(&full, &half, 1.1).is_err());
        assert_eq!(
            scale_mipmap(&full, &flat(5, 3, 1), 0.7),
            Err(Error::DimensionMismatch {
                expected: (10, 6),
                found: (8, 6)
            })
        );
        let rgb = Raster::new(4, 3, Depth::ThirtyTwo).unwrap();
        assert_eq!(scale_mipmap(&full, &rgb, 0.7), Err(Error::InvalidDepth(32)));
        let two = Raster::new(8, 6, Depth::Two).unwrap();
        assert_eq!(scale_mipmap(&two, &half, 0.7), Err(Error::InvalidDepth(2)));
        let mut indexed = half.clone();
        indexed
            .set_palette(Some(Palette::linear(Depth::Eight, 2).unwrap()))
            .unwrap();
        assert!(scale_mipmap(&full, &indexed, 0.7).is_err());
    }
}
