use itertools::multiunzip;
use tracing::trace;

use crate::{raster::Depth, Error, Result};

/// A single palette color
#[derive(Default, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Copy, Clone)]
pub struct Rgb {
    /// red component
    pub red: u8,
    /// green component
    pub green: u8,
    /// blue component
    pub blue: u8,
}

impl Rgb {
    /// Creates a color from its components
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Creates a neutral gray
    #[must_use]
    pub const fn gray(value: u8) -> Self {
        Self::new(value, value, value)
    }

    /// Gray value used whenever a palette entry is reduced to one sample:
    /// `(R + 2G + B) / 4`
    #[must_use]
    pub const fn luma(self) -> u8 {
        let sum = self.red as u16 + 2 * self.green as u16 + self.blue as u16;
        (sum / 4) as u8
    }

    /// True if all three components are equal
    #[must_use]
    pub const fn is_gray(self) -> bool {
        self.red == self.green && self.green == self.blue
    }

    fn distance_sq(self, other: Self) -> u32 {
        let d = |a: u8, b: u8| u32::from(a.abs_diff(b)).pow(2);
        d(self.red, other.red) + d(self.green, other.green) + d(self.blue, other.blue)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self::new(red, green, blue)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(value: Rgb) -> Self {
        [value.red, value.green, value.blue]
    }
}

/// An ordered, bounded color table for rasters of depth 1, 2, 4 or 8.
///
/// Entries are only ever appended, so an index stays valid for the life of the
/// palette. A palette holds at most `2^depth` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    depth: Depth,
    colors: Vec<Rgb>,
}

impl Palette {
    /// Creates an empty palette
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDepth`] for depths above 8
    pub fn new(depth: Depth) -> Result<Self> {
        if !depth.is_indexable() {
            return Err(Error::InvalidDepth(depth.bits()));
        }
        Ok(Self {
            depth,
            colors: Vec::with_capacity(1 << depth.bits()),
        })
    }

    /// Creates a palette of `nlevels` equally spaced grays from black to white
    /// inclusive, with `value(i) = round(255 * i / (nlevels - 1))`
    ///
    /// # Errors
    ///
    /// Returns an error if the depth is above 8 or `nlevels` is outside `[2, 2^depth]`
    pub fn linear(depth: Depth, nlevels: u32) -> Result<Self> {
        let mut palette = Self::new(depth)?;
        let capacity = palette.capacity();
        if nlevels < 2 || nlevels as usize > capacity {
            return Err(Error::invalid(
                "nlevels",
                format!("{nlevels} is outside [2, {capacity}]"),
            ));
        }
        let max = nlevels - 1;
        for i in 0..nlevels {
            let value = (255 * i + max / 2) / max;
            palette.add_color(Rgb::gray(u8::try_from(value).unwrap_or(u8::MAX)))?;
        }
        trace!("built linear palette with {nlevels} levels at depth {depth}");
        Ok(palette)
    }

    /// Returns the depth this palette indexes
    #[must_use]
    pub const fn depth(&self) -> Depth {
        self.depth
    }

    /// Returns the maximum number of entries: `2^depth`
    #[must_use]
    pub const fn capacity(&self) -> usize {
        1 << self.depth.bits()
    }

    /// Returns the number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns true if the palette holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns true if no more entries can be appended
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.colors.len() >= self.capacity()
    }

    /// Returns the entries in index order
    #[must_use]
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Appends a color and returns its index
    ///
    /// # Errors
    ///
    /// Returns [`Error::PaletteFull`] if the palette already holds `2^depth`
    /// entries; the palette is left untouched
    pub fn add_color(&mut self, color: impl Into<Rgb>) -> Result<usize> {
        if self.is_full() {
            return Err(Error::PaletteFull {
                capacity: self.capacity(),
            });
        }
        self.colors.push(color.into());
        Ok(self.colors.len() - 1)
    }

    /// Returns the color at `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::PaletteIndexOutOfBounds`] if there is no such entry
    pub fn get(&self, index: usize) -> Result<Rgb> {
        self.colors
            .get(index)
            .copied()
            .ok_or(Error::PaletteIndexOutOfBounds {
                index,
                len: self.colors.len(),
            })
    }

    /// Splits the palette into parallel red, green and blue arrays in index
    /// order. Lookup tables derived from a palette are built from these.
    #[must_use]
    pub fn to_arrays(&self) -> (Vec<u32>, Vec<u32>, Vec<u32>) {
        multiunzip(self.colors.iter().map(|c| {
            (
                u32::from(c.red),
                u32::from(c.green),
                u32::from(c.blue),
            )
        }))
    }

    /// Returns true if any entry has unequal red, green and blue components
    #[must_use]
    pub fn has_color(&self) -> bool {
        let (reds, greens, blues) = self.to_arrays();
        reds.iter()
            .zip(&greens)
            .zip(&blues)
            .any(|((r, g), b)| r != g || g != b)
    }

    /// Returns the index of the first entry equal to `color`
    #[must_use]
    pub fn find_color(&self, color: impl Into<Rgb>) -> Option<usize> {
        let color = color.into();
        self.colors.iter().position(|c| *c == color)
    }

    /// Returns the index of the entry closest to `color` in RGB space; ties go
    /// to the lowest index. `None` if the palette is empty.
    #[must_use]
    pub fn nearest_color(&self, color: impl Into<Rgb>) -> Option<usize> {
        let color = color.into();
        self.colors
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| (c.distance_sq(color), *i))
            .map(|(i, _)| i)
    }

    /// Returns the index of the entry whose luma is closest to `value`
    #[must_use]
    pub fn nearest_gray(&self, value: u8) -> Option<usize> {
        self.colors
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| (c.luma().abs_diff(value), *i))
            .map(|(i, _)| i)
    }

    /// Returns a copy of this palette re-declared at another depth
    ///
    /// # Errors
    ///
    /// Returns an error if `depth` is above 8 or too small to hold the entries
    pub fn with_depth(&self, depth: Depth) -> Result<Self> {
        let mut out = Self::new(depth)?;
        if self.len() > out.capacity() {
            return Err(Error::invalid(
                "depth",
                format!(
                    "{} entries do not fit a depth {depth} palette",
                    self.len()
                ),
            ));
        }
        out.colors.extend_from_slice(&self.colors);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_palette_rejects_append() {
        let mut palette = Palette::new(Depth::One).unwrap();
        assert_eq!(palette.add_color((0, 0, 0)).unwrap(), 0);
        assert_eq!(palette.add_color((255, 255, 255)).unwrap(), 1);
        assert_eq!(
            palette.add_color((9, 9, 9)),
            Err(Error::PaletteFull { capacity: 2 })
        );
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.get(1).unwrap(), Rgb::gray(255));
    }

    #[test]
    fn every_depth_fills_to_capacity_exactly() {
        for depth in [Depth::One, Depth::Two, Depth::Four, Depth::Eight] {
            let mut palette = Palette::new(depth).unwrap();
            for i in 0..palette.capacity() {
                let v = u8::try_from(i).unwrap();
                assert_eq!(palette.add_color((v, v, v)).unwrap(), i);
            }
            assert!(palette.add_color((1, 2, 3)).is_err());
            assert_eq!(palette.len(), palette.capacity());
            let brightest = u8::try_from(palette.capacity() - 1).unwrap();
            assert_eq!(palette.colors().last(), Some(&Rgb::gray(brightest)));
        }
    }

    #[test]
    fn deep_rasters_have_no_palette() {
        assert_eq!(Palette::new(Depth::Sixteen), Err(Error::InvalidDepth(16)));
        assert_eq!(Palette::new(Depth::ThirtyTwo), Err(Error::InvalidDepth(32)));
    }

    #[test]
    fn linear_palette_with_three_levels() {
        let palette = Palette::linear(Depth::Eight, 3).unwrap();
        assert_eq!(
            palette.colors(),
            &[Rgb::gray(0), Rgb::gray(128), Rgb::gray(255)]
        );
        assert!(!palette.has_color());
    }

    #[test]
    fn linear_palette_levels_are_bounded() {
        assert!(Palette::linear(Depth::Two, 1).is_err());
        assert!(Palette::linear(Depth::Two, 5).is_err());
        let p = Palette::linear(Depth::Two, 4).unwrap();
        assert_eq!(
            p.colors(),
            &[Rgb::gray(0), Rgb::gray(85), Rgb::gray(170), Rgb::gray(255)]
        );
    }

    #[test]
    fn get_out_of_bounds() {
        let palette = Palette::linear(Depth::One, 2).unwrap();
        assert_eq!(
            palette.get(2),
            Err(Error::PaletteIndexOutOfBounds { index: 2, len: 2 })
        );
    }

    #[test]
    fn arrays_and_color_detection() {
        let mut palette = Palette::new(Depth::Two).unwrap();
        palette.add_color((10, 10, 10)).unwrap();
        palette.add_color((200, 200, 200)).unwrap();
        let (r, g, b) = palette.to_arrays();
        assert_eq!(r, vec![10, 200]);
        assert_eq!(g, r);
        assert_eq!(b, r);
        assert!(!palette.has_color());
        palette.add_color((200, 10, 10)).unwrap();
        assert!(palette.has_color());
    }

    #[test]
    fn color_matching() {
        let mut palette = Palette::new(Depth::Four).unwrap();
        palette.add_color((0, 0, 0)).unwrap();
        palette.add_color((255, 0, 0)).unwrap();
        palette.add_color((0, 0, 255)).unwrap();
        palette.add_color((255, 255, 255)).unwrap();
        assert_eq!(palette.find_color((0, 0, 255)), Some(2));
        assert_eq!(palette.find_color((1, 0, 255)), None);
        assert_eq!(palette.nearest_color((200, 30, 20)), Some(1));
        assert_eq!(palette.nearest_color((240, 250, 230)), Some(3));
        assert_eq!(palette.nearest_gray(20), Some(0));
        assert_eq!(palette.nearest_gray(250), Some(3));
        assert_eq!(Palette::new(Depth::One).unwrap().nearest_color((1, 1, 1)), None);
    }

    #[test]
    fn depth_promotion_keeps_entries() {
        let palette = Palette::linear(Depth::Two, 4).unwrap();
        let promoted = palette.with_depth(Depth::Eight).unwrap();
        assert_eq!(promoted.colors(), palette.colors());
        assert_eq!(promoted.capacity(), 256);
        assert!(palette.with_depth(Depth::One).is_err());
    }
}
