use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
/// Possible `libpixr` errors
pub enum Error {
    /// Error returned if a depth is not one of the supported values, or is not
    /// accepted by the requested operation
    #[error("unsupported depth: {0} bits per pixel")]
    InvalidDepth(u32),
    /// Error returned if an argument lies outside its documented range
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// name of the offending argument
        name: &'static str,
        /// what was wrong with it
        reason: String,
    },
    /// Error returned if two inputs (or an input and its declared size) do not
    /// satisfy the size relationship an operation requires
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        /// the required dimensions
        expected: (usize, usize),
        /// the dimensions that were supplied
        found: (usize, usize),
    },
    /// Error returned if the pixel store could not be sized or reserved
    #[error("unable to allocate {words} words of pixel data")]
    Allocation {
        /// number of 32-bit words requested (saturated on overflow)
        words: usize,
    },
    /// Error returned if a pixel coordinate lies outside the raster
    #[error("pixel ({x}, {y}) is outside a {width}x{height} raster")]
    PixelOutOfBounds {
        /// requested column
        x: u32,
        /// requested row
        y: u32,
        /// raster width
        width: u32,
        /// raster height
        height: u32,
    },
    /// Error returned if a palette index does not name an entry
    #[error("palette index {index} is outside 0..{len}")]
    PaletteIndexOutOfBounds {
        /// requested index
        index: usize,
        /// number of entries in the palette
        len: usize,
    },
    /// Error returned when appending to a palette that already holds `2^depth` entries
    #[error("palette is full ({capacity} entries)")]
    PaletteFull {
        /// the palette capacity
        capacity: usize,
    },
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout `libpixr`
pub type Result<T> = std::result::Result<T, Error>;
