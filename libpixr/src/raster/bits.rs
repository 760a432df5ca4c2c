//! Field access inside packed scan lines.
//!
//! Pixels are stored most-significant-bit first within each 32-bit word, so a
//! pixel of depth `d` at column `x` starts `x * d` bits into the line. Every
//! depth-specific code path in the crate goes through the two accessors below
//! instead of hand-rolling its own shifts.

/// Number of 32-bit words needed to hold `width` pixels of `depth` bits.
#[must_use]
pub const fn words_per_line(width: u32, depth: u32) -> usize {
    ((width as usize) * (depth as usize)).div_ceil(32)
}

#[inline]
const fn locate(x: usize, depth: u32) -> (usize, u32, u32) {
    let bit = x * depth as usize;
    let shift = 32 - depth - (bit & 31) as u32;
    let mask = if depth == 32 { u32::MAX } else { (1 << depth) - 1 };
    (bit >> 5, shift, mask)
}

/// Reads the `depth`-bit field of pixel `x` from `line`.
#[inline]
#[must_use]
pub fn get_field(line: &[u32], x: usize, depth: u32) -> u32 {
    let (word, shift, mask) = locate(x, depth);
    (line[word] >> shift) & mask
}

/// Writes the `depth`-bit field of pixel `x` in `line`; bits of `value` above
/// the field width are discarded.
#[inline]
pub fn set_field(line: &mut [u32], x: usize, depth: u32, value: u32) {
    let (word, shift, mask) = locate(x, depth);
    let w = &mut line[word];
    *w = (*w & !(mask << shift)) | ((value & mask) << shift);
}

/// Reads byte `n` of a line (an 8 bpp pixel, or eight 1 bpp pixels, ...).
#[inline]
#[must_use]
pub fn get_byte(line: &[u32], n: usize) -> u8 {
    (line[n >> 2] >> (24 - 8 * (n & 3))).to_be_bytes()[3]
}

/// Copies the first `n` bytes of a line out in pixel order.
pub fn line_to_bytes(line: &[u32], n: usize) -> Vec<u8> {
    let mut out: Vec<u8> = line.iter().flat_map(|w| w.to_be_bytes()).collect();
    out.truncate(n);
    out
}

/// Packs `bytes` (in pixel order) into the start of `line`; a trailing partial
/// word is zero padded.
pub fn bytes_to_line(bytes: &[u8], line: &mut [u32]) {
    for (word, chunk) in line.iter_mut().zip(bytes.chunks(4)) {
        let mut be = [0u8; 4];
        be[..chunk.len()].copy_from_slice(chunk);
        *word = u32::from_be_bytes(be);
    }
}
