use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb as ImageRgb, RgbImage};
use libpixr::{convert::rgb_to_gray, Depth, DitherOptions, PaletteTarget};
use mktemp::Temp;
use pixr::{
    binarize, levels, load_indexed, load_raster, palette, rescale, to_gray, BinaryMode, Size,
};

fn color_fixture(dir: &Path) -> anyhow::Result<PathBuf> {
    let img = RgbImage::from_fn(20, 12, |x, y| ImageRgb([(x * 12) as u8, (y * 20) as u8, 90]));
    let path = dir.join("color.png");
    img.save(&path)?;
    Ok(path)
}

fn gray_fixture(dir: &Path) -> anyhow::Result<PathBuf> {
    let img = GrayImage::from_fn(16, 8, |x, _| Luma([(x * 17) as u8]));
    let path = dir.join("gray.png");
    img.save(&path)?;
    Ok(path)
}

#[test]
fn gray_matches_library_conversion() -> anyhow::Result<()> {
    let dir = Temp::new_dir()?;
    let input = color_fixture(dir.as_path())?;
    let output = dir.as_path().join("out.png");
    to_gray(&input, &output)?;

    let gray = load_raster(&output)?;
    assert_eq!(gray.depth(), Depth::Eight);
    assert_eq!(gray.dimensions(), (20, 12));
    for (x, y, v) in gray.pixels() {
        let expected = rgb_to_gray((x * 12) as u8, (y * 20) as u8, 90);
        assert_eq!(v, u32::from(expected), "({x}, {y})");
    }
    Ok(())
}

#[test]
fn binarize_writes_black_and_white() -> anyhow::Result<()> {
    let dir = Temp::new_dir()?;
    let input = gray_fixture(dir.as_path())?;
    let output = dir.as_path().join("out.png");

    binarize(&input, &output, BinaryMode::Threshold(128), 1)?;
    let out = load_raster(&output)?;
    assert_eq!(out.dimensions(), (16, 8));
    // columns 0..=7 are darker than 128
    for (x, _, v) in out.pixels() {
        assert_eq!(v, if x < 8 { 0 } else { 255 }, "column {x}");
    }

    binarize(&input, &output, BinaryMode::Threshold(128), 4)?;
    let out = load_raster(&output)?;
    assert_eq!(out.dimensions(), (64, 32));
    assert!(out.pixels().all(|(_, _, v)| v == 0 || v == 255));

    binarize(&input, &output, BinaryMode::Dither(DitherOptions::default()), 2)?;
    let out = load_raster(&output)?;
    assert_eq!(out.dimensions(), (32, 16));
    assert!(out.pixels().all(|(_, _, v)| v == 0 || v == 255));

    assert!(binarize(&input, &output, BinaryMode::Threshold(128), 3).is_err());
    Ok(())
}

#[test]
fn rescale_by_factor_and_size() -> anyhow::Result<()> {
    let dir = Temp::new_dir()?;
    let input = color_fixture(dir.as_path())?;
    let output = dir.as_path().join("out.png");

    rescale(&input, &output, Size::Factor(0.5))?;
    assert_eq!(load_raster(&output)?.dimensions(), (10, 6));

    rescale(&input, &output, Size::Dimensions { width: 40, height: 0 })?;
    assert_eq!(load_raster(&output)?.dimensions(), (40, 24));
    Ok(())
}

#[test]
fn levels_quantize_to_evenly_spaced_grays() -> anyhow::Result<()> {
    let dir = Temp::new_dir()?;
    let input = gray_fixture(dir.as_path())?;
    let output = dir.as_path().join("out.png");
    for with_palette in [false, true] {
        levels(&input, &output, 4, with_palette)?;
        let out = load_raster(&output)?;
        assert!(
            out.pixels().all(|(_, _, v)| [0, 85, 170, 255].contains(&v)),
            "palette: {with_palette}"
        );
    }
    assert!(levels(&input, &output, 1, false).is_err());
    Ok(())
}

#[test]
fn palette_indexing_and_removal() -> anyhow::Result<()> {
    let dir = Temp::new_dir()?;
    let colors = [[200, 10, 10], [10, 200, 10], [10, 10, 200]];
    let img = RgbImage::from_fn(6, 4, |x, _| ImageRgb(colors[(x % 3) as usize]));
    let input = dir.as_path().join("three.png");
    img.save(&input)?;

    let indexed = load_indexed(&input)?;
    assert_eq!(indexed.depth(), Depth::Two);
    assert_eq!(indexed.palette().map(|p| p.len()), Some(3));

    let output = dir.as_path().join("out.png");
    palette(&input, &output, PaletteTarget::Auto)?;
    let out = image::open(&output)?.to_rgb8();
    assert_eq!(out, img);

    palette(&input, &output, PaletteTarget::Grayscale)?;
    let out = load_raster(&output)?;
    assert_eq!(out.depth(), Depth::Eight);
    Ok(())
}
