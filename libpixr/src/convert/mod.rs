mod colormap;
mod quantize;
pub mod tables;
mod unpack;

use std::borrow::Cow;

use tracing::{instrument, trace};

pub use colormap::{remove_palette, PaletteTarget};
pub use quantize::{threshold_on_8bpp, threshold_to_2bpp, threshold_to_4bpp, threshold_to_binary};
pub use unpack::{
    convert_16_to_8, convert_1_to_16, convert_1_to_2, convert_1_to_32, convert_1_to_4,
    convert_1_to_8, convert_2_to_8, convert_4_to_8, convert_8_to_16, convert_8_to_2,
    convert_8_to_4, ByteSelect,
};

use crate::{
    raster::{compose_rgb, extract_rgb, Depth, Raster},
    Error, Result,
};

/// Luminance of an RGB sample: `0.3 R + 0.5 G + 0.2 B`, rounded
#[must_use]
pub const fn rgb_to_gray(red: u8, green: u8, blue: u8) -> u8 {
    let sum = 3 * red as u32 + 5 * green as u32 + 2 * blue as u32;
    ((sum + 5) / 10) as u8
}

/// Converts any raster to 8 bpp gray without a palette.
///
/// - a palette is removed to its luma values
/// - 1 bpp maps 0 to white and 1 to black
/// - 2 and 4 bpp are spread linearly over 0..=255
/// - 8 bpp is copied
/// - 16 bpp keeps the most significant byte
/// - 32 bpp becomes its luminance, see [`rgb_to_gray`]
///
/// # Errors
///
/// Returns [`crate::Error::Allocation`] if the output cannot be allocated
#[instrument(skip(raster), level = "trace")]
pub fn convert_to_gray(raster: &Raster) -> Result<Raster> {
    if raster.palette().is_some() {
        return remove_palette(raster, PaletteTarget::Grayscale);
    }
    match raster.depth() {
        Depth::One => convert_1_to_8(raster, 255, 0),
        Depth::Two => convert_2_to_8(raster, [0, 85, 170, 255], false),
        Depth::Four => convert_4_to_8(raster, false),
        Depth::Eight => Ok(raster.clone()),
        Depth::Sixteen => convert_16_to_8(raster, ByteSelect::Msb),
        Depth::ThirtyTwo => {
            let mut out = raster.blank_like(Depth::Eight)?;
            for y in 0..raster.height() as usize {
                let row: Vec<u8> = raster
                    .line(y)
                    .iter()
                    .map(|&p| {
                        let c = extract_rgb(p);
                        rgb_to_gray(c.red, c.green, c.blue)
                    })
                    .collect();
                out.set_gray_row(y, &row);
            }
            trace!("reduced {}x{} rgb to luminance", raster.width(), raster.height());
            Ok(out)
        }
    }
}

/// Converts any raster to 32 bpp RGB without a palette. Palettes are
/// expanded to full color; everything else goes through [`convert_to_gray`]
/// and is replicated into all three channels.
///
/// # Errors
///
/// Returns [`crate::Error::Allocation`] if the output cannot be allocated
#[instrument(skip(raster), level = "trace")]
pub fn convert_to_32(raster: &Raster) -> Result<Raster> {
    if raster.palette().is_some() {
        return remove_palette(raster, PaletteTarget::FullColor);
    }
    match raster.depth() {
        Depth::One => convert_1_to_32(raster, compose_rgb(255, 255, 255), 0),
        Depth::ThirtyTwo => Ok(raster.clone()),
        _ => {
            let gray = gray_input(raster)?;
            let mut out = gray.blank_like(Depth::ThirtyTwo)?;
            for y in 0..gray.height() as usize {
                let row = gray.gray_row(y);
                for (word, v) in out.line_mut(y).iter_mut().zip(row) {
                    *word = compose_rgb(v, v, v);
                }
            }
            Ok(out)
        }
    }
}

/// Borrows an 8 bpp palette-free raster as is, and converts anything else
/// with [`convert_to_gray`]
pub(crate) fn gray_input(raster: &Raster) -> Result<Cow<'_, Raster>> {
    if raster.depth() == Depth::Eight && raster.palette().is_none() {
        Ok(Cow::Borrowed(raster))
    } else {
        trace!("normalizing {} bpp input to gray", raster.depth());
        convert_to_gray(raster).map(Cow::Owned)
    }
}

/// Like [`gray_input`], but palette-free input must already be 8 bpp
pub(crate) fn eight_bit_input(raster: &Raster) -> Result<Cow<'_, Raster>> {
    if raster.palette().is_none() && raster.depth() != Depth::Eight {
        return Err(Error::InvalidDepth(raster.depth().bits()));
    }
    gray_input(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Palette, Rgb};

    #[test]
    fn luminance_weights() {
        assert_eq!(rgb_to_gray(255, 255, 255), 255);
        assert_eq!(rgb_to_gray(0, 0, 0), 0);
        assert_eq!(rgb_to_gray(255, 0, 0), 77);
        assert_eq!(rgb_to_gray(0, 255, 0), 128);
        assert_eq!(rgb_to_gray(0, 0, 255), 51);
    }

    #[test]
    fn every_depth_reaches_gray() {
        let mut one = Raster::new(2, 1, Depth::One).unwrap();
        one.set_pixel(0, 0, 1).unwrap();
        assert_eq!(convert_to_gray(&one).unwrap().gray_row(0), vec![0, 255]);

        let mut two = Raster::new(4, 1, Depth::Two).unwrap();
        for x in 0..4 {
            two.set_pixel(x, 0, x).unwrap();
        }
        assert_eq!(convert_to_gray(&two).unwrap().gray_row(0), vec![0, 85, 170, 255]);

        let mut four = Raster::new(1, 1, Depth::Four).unwrap();
        four.set_pixel(0, 0, 2).unwrap();
        assert_eq!(convert_to_gray(&four).unwrap().gray_row(0), vec![34]);

        let mut sixteen = Raster::new(1, 1, Depth::Sixteen).unwrap();
        sixteen.set_pixel(0, 0, 0xab12).unwrap();
        assert_eq!(convert_to_gray(&sixteen).unwrap().gray_row(0), vec![0xab]);

        let rgb = Raster::from_rgb_bytes(2, 1, &[255, 0, 0, 10, 10, 10]).unwrap();
        assert_eq!(convert_to_gray(&rgb).unwrap().gray_row(0), vec![77, 10]);
    }

    #[test]
    fn gray_input_borrows_plain_gray() {
        let r = Raster::from_gray_bytes(2, 1, &[1, 2]).unwrap();
        assert!(matches!(gray_input(&r).unwrap(), Cow::Borrowed(_)));
        let mut p = r.clone();
        p.set_palette(Some(Palette::linear(Depth::Eight, 3).unwrap()))
            .unwrap();
        let g = gray_input(&p).unwrap();
        assert!(matches!(g, Cow::Owned(_)));
        assert!(g.palette().is_none());
        assert_eq!(g.gray_row(0), vec![128, 255]);
    }

    #[test]
    fn promotion_to_rgb() {
        let mut one = Raster::new(2, 1, Depth::One).unwrap();
        one.set_pixel(1, 0, 1).unwrap();
        let out = convert_to_32(&one).unwrap();
        assert_eq!(out.get_rgb(0, 0).unwrap(), Rgb::gray(255));
        assert_eq!(out.get_rgb(1, 0).unwrap(), Rgb::gray(0));

        let gray = Raster::from_gray_bytes(1, 1, &[42]).unwrap();
        assert_eq!(convert_to_32(&gray).unwrap().get_rgb(0, 0).unwrap(), Rgb::gray(42));

        let mut palette = Palette::new(Depth::Two).unwrap();
        palette.add_color((1, 2, 3)).unwrap();
        let mut indexed = Raster::new(1, 1, Depth::Two).unwrap();
        indexed.set_palette(Some(palette)).unwrap();
        assert_eq!(convert_to_32(&indexed).unwrap().get_rgb(0, 0).unwrap(), Rgb::new(1, 2, 3));
    }
}
