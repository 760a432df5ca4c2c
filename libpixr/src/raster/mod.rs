#![allow(clippy::module_name_repetitions)]

pub(crate) mod bits;
pub(crate) mod palette;

use std::fmt::Display;

use tracing::trace;

use crate::{Error, Result};
use bits::{bytes_to_line, get_field, line_to_bytes, set_field, words_per_line};
pub use palette::{Palette, Rgb};

#[derive(Default, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Copy, Clone)]
/// Bits per pixel of a [`Raster`]
pub enum Depth {
    /// 1 bit per pixel: binary images, 1 = ON (black)
    #[default]
    One,
    /// 2 bits per pixel
    Two,
    /// 4 bits per pixel
    Four,
    /// 8 bits per pixel: grayscale or palette indices
    Eight,
    /// 16 bits per pixel
    Sixteen,
    /// 32 bits per pixel: packed RGB, `r << 24 | g << 16 | b << 8`
    ThirtyTwo,
}

impl Depth {
    /// Returns the number of bits per pixel
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
            Self::Sixteen => 16,
            Self::ThirtyTwo => 32,
        }
    }

    /// Returns the largest sample value a pixel of this depth can hold
    #[must_use]
    pub const fn max_value(self) -> u32 {
        match self {
            Self::ThirtyTwo => u32::MAX,
            d => (1 << d.bits()) - 1,
        }
    }

    /// True for depths that may carry a [`Palette`] (1, 2, 4 and 8)
    #[must_use]
    pub const fn is_indexable(self) -> bool {
        matches!(self, Self::One | Self::Two | Self::Four | Self::Eight)
    }
}

impl From<Depth> for u32 {
    fn from(value: Depth) -> Self {
        value.bits()
    }
}

impl Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl TryFrom<u32> for Depth {
    type Error = Error;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            32 => Ok(Self::ThirtyTwo),
            _ => Err(Error::InvalidDepth(value)),
        }
    }
}

/// Packs an RGB triple into a 32 bpp pixel
#[must_use]
pub const fn compose_rgb(red: u8, green: u8, blue: u8) -> u32 {
    (red as u32) << 24 | (green as u32) << 16 | (blue as u32) << 8
}

/// Unpacks a 32 bpp pixel into its RGB triple
#[must_use]
pub const fn extract_rgb(pixel: u32) -> Rgb {
    let [red, green, blue, _] = pixel.to_be_bytes();
    Rgb::new(red, green, blue)
}

/// A packed raster image.
///
/// Pixels of `depth` bits are packed most-significant-bit first into 32-bit
/// words; every scan line starts on a word boundary and spans
/// [`Raster::wpl`] words. Unused bits at the end of a line ("pad bits") have
/// no meaning unless normalized with [`Raster::set_pad_bits`].
///
/// A raster exclusively owns its pixel words and its optional [`Palette`];
/// [`Clone`] is a deep copy of both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    depth: Depth,
    wpl: usize,
    data: Vec<u32>,
    palette: Option<Palette>,
    resolution: (u32, u32),
}

fn allocate(wpl: usize, height: u32) -> Result<Vec<u32>> {
    let words = wpl
        .checked_mul(height as usize)
        .ok_or(Error::Allocation { words: usize::MAX })?;
    let mut data = Vec::new();
    data.try_reserve_exact(words)
        .map_err(|_| Error::Allocation { words })?;
    data.resize(words, 0);
    Ok(data)
}

impl Raster {
    /// Creates a zero-filled raster
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the pixel words cannot be reserved
    pub fn new(width: u32, height: u32, depth: Depth) -> Result<Self> {
        let wpl = words_per_line(width, depth.bits());
        let data = allocate(wpl, height)?;
        trace!("allocated {width}x{height}x{depth} raster, {wpl} words per line");
        Ok(Self {
            width,
            height,
            depth,
            wpl,
            data,
            palette: None,
            resolution: (0, 0),
        })
    }

    /// Creates a raster whose contents are unspecified; every pixel must be
    /// written before it is read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the pixel words cannot be reserved
    pub fn new_uninit(width: u32, height: u32, depth: Depth) -> Result<Self> {
        // Safe code cannot hand out uninitialized words, so this shares the
        // zeroing allocation; callers still may not rely on the contents.
        Self::new(width, height, depth)
    }

    /// Creates a zeroed raster with the dimensions, depth, resolution and a
    /// copy of the palette of `template`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the pixel words cannot be reserved
    pub fn new_like(template: &Self) -> Result<Self> {
        let mut out = Self::new(template.width, template.height, template.depth)?;
        out.palette.clone_from(&template.palette);
        out.resolution = template.resolution;
        Ok(out)
    }

    /// Zeroed raster of the given size and depth carrying this raster's
    /// resolution but no palette
    pub(crate) fn blank_sized(&self, width: u32, height: u32, depth: Depth) -> Result<Self> {
        let mut out = Self::new(width, height, depth)?;
        out.resolution = self.resolution;
        Ok(out)
    }

    /// Zeroed raster with this raster's dimensions and resolution at another depth
    pub(crate) fn blank_like(&self, depth: Depth) -> Result<Self> {
        self.blank_sized(self.width, self.height, depth)
    }

    /// Adopts a word array laid out as described on [`Raster`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `words` does not hold exactly
    /// `wpl * height` words
    pub fn from_words(width: u32, height: u32, depth: Depth, words: Vec<u32>) -> Result<Self> {
        let wpl = words_per_line(width, depth.bits());
        if words.len() != wpl * height as usize {
            return Err(Error::DimensionMismatch {
                expected: (wpl, height as usize),
                found: (words.len(), 1),
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            wpl,
            data: words,
            palette: None,
            resolution: (0, 0),
        })
    }

    /// Packs row-major 8-bit gray samples into an 8 bpp raster
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `bytes.len() != width * height`
    pub fn from_gray_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let w = width as usize;
        if bytes.len() != w * height as usize {
            return Err(Error::DimensionMismatch {
                expected: (w, height as usize),
                found: (bytes.len(), 1),
            });
        }
        let mut out = Self::new(width, height, Depth::Eight)?;
        if w > 0 {
            for (y, row) in bytes.chunks_exact(w).enumerate() {
                bytes_to_line(row, out.line_mut(y));
            }
        }
        Ok(out)
    }

    /// Packs row-major interleaved RGB samples into a 32 bpp raster
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `bytes.len() != 3 * width * height`
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let n = width as usize * height as usize;
        if bytes.len() != 3 * n {
            return Err(Error::DimensionMismatch {
                expected: (3 * width as usize, height as usize),
                found: (bytes.len(), 1),
            });
        }
        let mut out = Self::new(width, height, Depth::ThirtyTwo)?;
        for (word, rgb) in out.data.iter_mut().zip(bytes.chunks_exact(3)) {
            *word = compose_rgb(rgb[0], rgb[1], rgb[2]);
        }
        Ok(out)
    }

    /// Returns the width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the depth
    #[must_use]
    pub const fn depth(&self) -> Depth {
        self.depth
    }

    /// Returns the number of 32-bit words in each scan line
    #[must_use]
    pub const fn wpl(&self) -> usize {
        self.wpl
    }

    /// Returns the packed pixel words, line after line
    #[must_use]
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Returns the packed pixel words mutably
    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    /// Returns `(xres, yres)` in samples per unit; 0 means unknown
    #[must_use]
    pub const fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Sets the resolution metadata
    pub fn set_resolution(&mut self, xres: u32, yres: u32) {
        self.resolution = (xres, yres);
    }

    /// Returns the palette, if any
    #[must_use]
    pub const fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Attaches (or with `None`, drops) a palette
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDepth`] if the palette depth differs from the
    /// raster depth
    pub fn set_palette(&mut self, palette: Option<Palette>) -> Result<()> {
        if let Some(p) = &palette {
            if p.depth() != self.depth {
                return Err(Error::InvalidDepth(p.depth().bits()));
            }
        }
        self.palette = palette;
        Ok(())
    }

    /// Detaches and returns the palette
    pub fn take_palette(&mut self) -> Option<Palette> {
        self.palette.take()
    }

    /// Returns scan line `y`
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`
    #[must_use]
    pub fn line(&self, y: usize) -> &[u32] {
        &self.data[y * self.wpl..(y + 1) * self.wpl]
    }

    /// Returns scan line `y` mutably
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`
    pub fn line_mut(&mut self, y: usize) -> &mut [u32] {
        &mut self.data[y * self.wpl..(y + 1) * self.wpl]
    }

    pub(crate) fn lines_mut(&mut self) -> impl Iterator<Item = &mut [u32]> {
        self.data.chunks_exact_mut(self.wpl.max(1))
    }

    /// Copies an 8 bpp line out as bytes
    pub(crate) fn gray_row(&self, y: usize) -> Vec<u8> {
        debug_assert_eq!(self.depth, Depth::Eight);
        line_to_bytes(self.line(y), self.width as usize)
    }

    /// Writes bytes into an 8 bpp line
    pub(crate) fn set_gray_row(&mut self, y: usize, row: &[u8]) {
        debug_assert_eq!(self.depth, Depth::Eight);
        bytes_to_line(row, self.line_mut(y));
    }

    fn check_bounds(&self, x: u32, y: u32) -> Result<()> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(Error::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Returns the value of pixel `(x, y)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::PixelOutOfBounds`] if the pixel is outside the raster
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<u32> {
        self.check_bounds(x, y)?;
        Ok(get_field(self.line(y as usize), x as usize, self.depth.bits()))
    }

    /// Sets the value of pixel `(x, y)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::PixelOutOfBounds`] if the pixel is outside the raster
    /// and [`Error::InvalidParameter`] if `value` does not fit the depth
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u32) -> Result<()> {
        self.check_bounds(x, y)?;
        if value > self.depth.max_value() {
            return Err(Error::invalid(
                "value",
                format!("{value} does not fit in {} bits", self.depth),
            ));
        }
        let depth = self.depth.bits();
        set_field(self.line_mut(y as usize), x as usize, depth, value);
        Ok(())
    }

    /// Returns the color of a 32 bpp pixel
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDepth`] for other depths and
    /// [`Error::PixelOutOfBounds`] outside the raster
    pub fn get_rgb(&self, x: u32, y: u32) -> Result<Rgb> {
        if self.depth != Depth::ThirtyTwo {
            return Err(Error::InvalidDepth(self.depth.bits()));
        }
        self.get_pixel(x, y).map(extract_rgb)
    }

    /// Sets the color of a 32 bpp pixel
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDepth`] for other depths and
    /// [`Error::PixelOutOfBounds`] outside the raster
    pub fn set_rgb(&mut self, x: u32, y: u32, color: impl Into<Rgb>) -> Result<()> {
        if self.depth != Depth::ThirtyTwo {
            return Err(Error::InvalidDepth(self.depth.bits()));
        }
        let c = color.into();
        self.set_pixel(x, y, compose_rgb(c.red, c.green, c.blue))
    }

    /// Sets the pad bits at the end of every line to all 0 (`false`) or all 1
    /// (`true`). Nothing happens at 32 bpp or when lines end on a word boundary.
    pub fn set_pad_bits(&mut self, value: bool) {
        let used = (self.width as usize * self.depth.bits() as usize) % 32;
        if self.depth == Depth::ThirtyTwo || used == 0 {
            return;
        }
        let mask = u32::MAX >> used;
        for line in self.lines_mut() {
            if let Some(last) = line.last_mut() {
                if value {
                    *last |= mask;
                } else {
                    *last &= !mask;
                }
            }
        }
    }

    /// Returns a copy with every pixel bit complemented
    #[must_use]
    pub fn inverted(&self) -> Self {
        let mut out = self.clone();
        for word in &mut out.data {
            *word = !*word;
        }
        out
    }

    /// Iterates over `(x, y, value)` for every pixel in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let depth = self.depth.bits();
        (0..self.height).flat_map(move |y| {
            let line = self.line(y as usize);
            (0..self.width).map(move |x| (x, y, get_field(line, x as usize, depth)))
        })
    }
}
