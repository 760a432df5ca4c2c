use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, instrument};

use super::{gray_rows, scaled_output};
use crate::{
    convert::eight_bit_input,
    raster::{Depth, Raster},
    Error, Result,
};

/// Statistic kept from each cell by [`scale_gray_min_max`]
#[derive(Default, Debug, Eq, PartialEq, Copy, Clone, EnumString, IntoStaticStr, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum MinMaxKind {
    /// darkest value
    #[default]
    Min,
    /// lightest value
    Max,
    /// lightest minus darkest
    MaxDiff,
}

impl MinMaxKind {
    fn apply(self, min: u8, max: u8) -> u8 {
        match self {
            Self::Min => min,
            Self::Max => max,
            Self::MaxDiff => max - min,
        }
    }
}

fn check_halvable(raster: &Raster) -> Result<()> {
    if raster.width() < 2 || raster.height() < 2 {
        return Err(Error::invalid(
            "raster",
            format!("{}x{} is too small to halve", raster.width(), raster.height()),
        ));
    }
    Ok(())
}

/// Applies `reduce` to the four values of every 2x2 cell
fn reduce_2x2(gray: &Raster, reduce: impl Fn([u8; 4]) -> u8) -> Result<Raster> {
    let (wd, hd) = (gray.width() / 2, gray.height() / 2);
    let mut out = scaled_output(gray, wd, hd, Depth::Eight, 0.5, 0.5)?;
    for i in 0..hd as usize {
        let (top, bottom) = (gray.gray_row(2 * i), gray.gray_row(2 * i + 1));
        let line: Vec<u8> = (0..wd as usize)
            .map(|j| reduce([top[2 * j], top[2 * j + 1], bottom[2 * j], bottom[2 * j + 1]]))
            .collect();
        out.set_gray_row(i, &line);
    }
    Ok(out)
}

/// Reduces 8 bpp gray by integer factors, keeping the minimum, maximum or
/// range of each `xfact x yfact` cell.
///
/// The output is `max(1, w / xfact) x max(1, h / yfact)`; a factor larger
/// than the image covers the whole axis. `(2, 2)` goes to
/// [`scale_gray_min_max_2`].
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for a zero factor or an empty raster
/// and [`Error::InvalidDepth`] unless the input is 8 bpp (or palette indexed)
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_min_max(
    raster: &Raster,
    xfact: u32,
    yfact: u32,
    kind: MinMaxKind,
) -> Result<Raster> {
    if xfact == 0 || yfact == 0 {
        return Err(Error::invalid(
            "xfact",
            format!("factors ({xfact}, {yfact}) must be at least 1"),
        ));
    }
    if xfact == 2 && yfact == 2 {
        return scale_gray_min_max_2(raster, kind);
    }
    let gray = eight_bit_input(raster)?;
    let (ws, hs) = gray.dimensions();
    if ws == 0 || hs == 0 {
        return Err(Error::invalid("raster", "cannot reduce an empty raster"));
    }
    let (xfact, yfact) = (xfact.min(ws), yfact.min(hs));
    let (wd, hd) = (ws / xfact, hs / yfact);
    let rows = gray_rows(&gray);
    let mut out = scaled_output(
        &gray,
        wd,
        hd,
        Depth::Eight,
        1.0 / f64::from(xfact),
        1.0 / f64::from(yfact),
    )?;
    let (xf, yf) = (xfact as usize, yfact as usize);
    for i in 0..hd as usize {
        let cell_rows = &rows[i * yf..(i + 1) * yf];
        let line: Vec<u8> = (0..wd as usize)
            .map(|j| {
                let (min, max) = cell_rows
                    .iter()
                    .flat_map(|row| &row[j * xf..(j + 1) * xf])
                    .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
                kind.apply(min, max)
            })
            .collect();
        out.set_gray_row(i, &line);
    }
    Ok(out)
}

/// Reduces 8 bpp gray by 2x, keeping the minimum, maximum or range of each
/// 2x2 cell
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if either side is shorter than 2 and
/// [`Error::InvalidDepth`] unless the input is 8 bpp (or palette indexed)
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_min_max_2(raster: &Raster, kind: MinMaxKind) -> Result<Raster> {
    let gray = eight_bit_input(raster)?;
    check_halvable(&gray)?;
    reduce_2x2(&gray, |cell| {
        let min = cell.iter().copied().min().unwrap_or(0);
        let max = cell.iter().copied().max().unwrap_or(0);
        kind.apply(min, max)
    })
}

/// Value of rank `rank` (1 = darkest, 4 = lightest) among four
fn rank_of_four(cell: [u8; 4], rank: u32) -> u8 {
    let (mut min_index, mut max_index) = (0, 0);
    for k in 1..4 {
        if cell[k] < cell[min_index] {
            min_index = k;
        } else if cell[k] > cell[max_index] {
            max_index = k;
        }
    }
    let middle: Vec<u8> = (0..4)
        .filter(|&k| k != min_index && k != max_index)
        .map(|k| cell[k])
        .collect();
    match middle.as_slice() {
        [a, b] if rank == 2 => *a.min(b),
        [a, b] => *a.max(b),
        // every value is equal
        _ => cell[min_index],
    }
}

/// Reduces 8 bpp gray by 2x, keeping the value of rank `rank` in each 2x2
/// cell: 1 is the minimum and 4 the maximum, both of which take the
/// [`scale_gray_min_max_2`] path. For 2 and 3 the extremes are set aside and
/// the smaller or larger remaining value is kept.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] unless `1 <= rank <= 4` or if either
/// side is shorter than 2, and [`Error::InvalidDepth`] unless the input is
/// 8 bpp (or palette indexed)
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_rank_2(raster: &Raster, rank: u32) -> Result<Raster> {
    match rank {
        1 => scale_gray_min_max_2(raster, MinMaxKind::Min),
        4 => scale_gray_min_max_2(raster, MinMaxKind::Max),
        2 | 3 => {
            let gray = eight_bit_input(raster)?;
            check_halvable(&gray)?;
            reduce_2x2(&gray, |cell| rank_of_four(cell, rank))
        }
        _ => Err(Error::invalid("rank", format!("{rank} is outside 1..=4"))),
    }
}

/// Applies up to four successive [`scale_gray_rank_2`] reductions. A rank of 0
/// ends the cascade early; with no reduction at all the gray input is
/// returned as is.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for more than four ranks, a rank above
/// 4, or an image that becomes too small to halve
#[instrument(skip(raster), level = "trace")]
pub fn scale_gray_rank_cascade(raster: &Raster, ranks: &[u32]) -> Result<Raster> {
    if ranks.len() > 4 {
        return Err(Error::invalid("ranks", format!("{} levels given, at most 4", ranks.len())));
    }
    if let Some(&bad) = ranks.iter().find(|&&r| r > 4) {
        return Err(Error::invalid("ranks", format!("{bad} is outside 0..=4")));
    }
    let mut out = eight_bit_input(raster)?.into_owned();
    for (level, &rank) in ranks.iter().take_while(|&&r| r != 0).enumerate() {
        debug!("cascade level {}: rank {rank}", level + 1);
        out = scale_gray_rank_2(&out, rank)?;
    }
    Ok(out)
}
