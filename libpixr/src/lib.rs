//! # libpixr
//!
//! A packed-depth raster engine: an in-memory raster whose pixels of 1, 2, 4, 8,
//! 16 or 32 bits are packed into 32-bit words, a palette (colormap) type, and the
//! transforms needed to bring arbitrary input down to the depth and resolution a
//! downstream encoder (typically a bilevel compressor) wants:
//!
//! - depth conversion and palette removal ([`convert`])
//! - grayscale level quantization and thresholding ([`convert`])
//! - Floyd–Steinberg error diffusion to 1 or 2 bpp ([`dither`])
//! - sampling, linear interpolation, area mapping, mipmap blending and rank
//!   reduction ([`scale`])
//!
//! Every operation borrows its input and returns a new, independently owned
//! [`Raster`]; nothing here performs file I/O.
//!
//! ### Usage
//!
//! ```rust
//! use libpixr::{convert, dither, DitherOptions, Raster};
//!
//! fn main() -> anyhow::Result<()> {
//!     // a small horizontal gradient
//!     let bytes: Vec<u8> = (0..64u32).map(|i| ((i % 16) * 17) as u8).collect();
//!     let gray = Raster::from_gray_bytes(16, 4, &bytes)?;
//!
//!     let binary = convert::threshold_to_binary(&gray, 128)?;
//!     assert_eq!(binary.get_pixel(0, 0)?, 1); // dark pixels are ON
//!     assert_eq!(binary.get_pixel(15, 0)?, 0);
//!
//!     let dithered = dither::dither_to_binary(&gray, &DitherOptions::default())?;
//!     assert_eq!(dithered.dimensions(), (16, 4));
//!     Ok(())
//! }
//! ```
//!
//! ### Pixel layout
//!
//! Pixel `x` of a `d`-bit line lives in word `x * d / 32`, most significant bits
//! first. For 8 bpp this means `u32::to_be_bytes` of a word yields four pixels
//! in order. 32 bpp pixels hold `r << 24 | g << 16 | b << 8`.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

/// Depth conversion, palette removal and grayscale quantization
pub mod convert;
/// Floyd–Steinberg error diffusion
pub mod dither;
mod error;
/// The packed raster and its palette
pub mod raster;
/// Geometric scaling
pub mod scale;

pub use convert::PaletteTarget;
pub use dither::DitherOptions;
pub use error::{Error, Result};
pub use raster::{Depth, Palette, Raster, Rgb};
pub use scale::MinMaxKind;
