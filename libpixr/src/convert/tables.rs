//! Lookup tables for depth conversion and gray quantization.
//!
//! All tables are plain values built per call; nothing here is cached.

use crate::{raster::Depth, Error, Result};

fn check_levels(nlevels: u32, max: u32) -> Result<()> {
    if (2..=max).contains(&nlevels) {
        Ok(())
    } else {
        Err(Error::invalid(
            "nlevels",
            format!("{nlevels} is outside [2, {max}]"),
        ))
    }
}

/// Smallest level `j` with `value <= 255 * (2j + 1) / (2n - 2)`
fn quant_level(value: u32, nlevels: u32) -> u32 {
    (0..nlevels)
        .find(|&j| value <= 255 * (2 * j + 1) / (2 * nlevels - 2))
        .unwrap_or(nlevels - 1)
}

/// Builds the table mapping an 8-bit gray value to the index of one of
/// `nlevels` equally spaced levels. Level `j` covers values up to
/// `floor(255 * (2j + 1) / (2 * nlevels - 2))`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] unless `2 <= nlevels <= 256`
pub fn gray_quant_index_table(nlevels: u32) -> Result<[u8; 256]> {
    check_levels(nlevels, 256)?;
    let mut table = [0u8; 256];
    for (v, entry) in (0u32..).zip(table.iter_mut()) {
        *entry = u8::try_from(quant_level(v, nlevels)).unwrap_or(u8::MAX);
    }
    Ok(table)
}

/// Builds the table mapping an 8-bit gray value to the literal sample value of
/// its quantization level at `depth`: level `j` becomes
/// `round((2^depth - 1) * j / (nlevels - 1))`.
///
/// For depths below 8 the level count is forced to `2^depth`.
///
/// # Errors
///
/// Returns [`Error::InvalidDepth`] for depths above 8 and
/// [`Error::InvalidParameter`] unless `2 <= nlevels <= 256`
pub fn gray_quant_target_table(nlevels: u32, depth: Depth) -> Result<[u8; 256]> {
    if !depth.is_indexable() {
        return Err(Error::InvalidDepth(depth.bits()));
    }
    check_levels(nlevels, 256)?;
    let maxval = depth.max_value();
    let nlevels = if depth == Depth::Eight {
        nlevels
    } else {
        maxval + 1
    };
    let span = nlevels - 1;
    let mut table = [0u8; 256];
    for (v, entry) in (0u32..).zip(table.iter_mut()) {
        let j = quant_level(v, nlevels);
        let value = (2 * maxval * j + span) / (2 * span);
        *entry = u8::try_from(value).unwrap_or(u8::MAX);
    }
    Ok(table)
}

/// Builds an expansion table: each index is a group of `group_bits` source bits
/// holding pixels of `src_bits`, and each entry is the concatenation of
/// `values[pixel]` at `dst_bits` per pixel, first pixel most significant.
fn expansion_table<const N: usize>(src_bits: u32, dst_bits: u32, values: &[u32]) -> [u32; N] {
    let group_bits = N.trailing_zeros();
    let per_group = group_bits / src_bits;
    let src_mask = (1usize << src_bits) - 1;
    let mut table = [0u32; N];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (0..per_group).fold(0, |acc, k| {
            let pixel = (i >> (group_bits - src_bits * (k + 1))) & src_mask;
            acc | values[pixel] << (dst_bits * (per_group - 1 - k))
        });
    }
    table
}

/// 1 bpp → 2 bpp: one source byte (8 pixels) to 16 output bits
#[must_use]
pub fn expand_1_to_2_table(val0: u8, val1: u8) -> [u32; 256] {
    expansion_table(1, 2, &[u32::from(val0), u32::from(val1)])
}

/// 1 bpp → 4 bpp: one source byte (8 pixels) to one output word
#[must_use]
pub fn expand_1_to_4_table(val0: u8, val1: u8) -> [u32; 256] {
    expansion_table(1, 4, &[u32::from(val0), u32::from(val1)])
}

/// 1 bpp → 8 bpp: one source nibble (4 pixels) to one output word
#[must_use]
pub fn expand_1_to_8_table(val0: u8, val1: u8) -> [u32; 16] {
    expansion_table(1, 8, &[u32::from(val0), u32::from(val1)])
}

/// 1 bpp → 16 bpp: one source dibit (2 pixels) to one output word
#[must_use]
pub fn expand_1_to_16_table(val0: u16, val1: u16) -> [u32; 4] {
    expansion_table(1, 16, &[u32::from(val0), u32::from(val1)])
}

/// 1 bpp → 32 bpp: one source bit to one output word
#[must_use]
pub const fn expand_1_to_32_table(val0: u32, val1: u32) -> [u32; 2] {
    [val0, val1]
}

/// 2 bpp → 8 bpp: one source byte (4 pixels) to one output word
#[must_use]
pub fn expand_2_to_8_table(values: [u8; 4]) -> [u32; 256] {
    expansion_table(2, 8, &values.map(u32::from))
}

/// 4 bpp → 8 bpp: one source byte (2 pixels) to 16 output bits
#[must_use]
pub fn expand_4_to_8_table(values: [u8; 16]) -> [u32; 256] {
    expansion_table(4, 8, &values.map(u32::from))
}
