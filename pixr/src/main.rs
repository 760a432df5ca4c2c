use libpixr::{DitherOptions, PaletteTarget};
use pixr::{binarize, levels, palette, rescale, to_gray, BinaryMode, Size};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

#[cfg(not(debug_assertions))]
const DEFAULT_DEBUG_LEVEL: u8 = 1;
#[cfg(debug_assertions)]
const DEFAULT_DEBUG_LEVEL: u8 = 99;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(short, long, default_value_t = DEFAULT_DEBUG_LEVEL, action = clap::ArgAction::Count)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// converts an image to 8-bit gray
    Gray {
        /// The input image
        img_file: PathBuf,
        /// The output file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// reduces an image to black and white
    Binarize {
        /// The input image
        img_file: PathBuf,
        /// The output file name
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Gray values below this become black
        #[arg(short, long, default_value_t = 128)]
        threshold: u32,
        /// Use error diffusion instead of a threshold
        #[arg(short, long)]
        dither: bool,
        /// Enlarge by this factor (1, 2 or 4) before reducing
        #[arg(
            short,
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..=4)
        )]
        upsample: u32,
        /// Dark error below this is not diffused
        #[arg(long, default_value_t = 10)]
        lower_clip: u32,
        /// Light error below this is not diffused
        #[arg(long, default_value_t = 10)]
        upper_clip: u32,
    },

    /// resizes an image
    Scale {
        /// The input image
        img_file: PathBuf,
        /// The output file name
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Scale factor for both axes
        #[arg(short, long, conflicts_with_all = ["width", "height"])]
        factor: Option<f32>,
        /// Output width, derived from the height if omitted
        #[arg(long)]
        width: Option<u32>,
        /// Output height, derived from the width if omitted
        #[arg(long)]
        height: Option<u32>,
    },

    /// quantizes an image to a number of gray levels
    Levels {
        /// The input image
        img_file: PathBuf,
        /// The output file name
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of gray levels
        #[arg(short, long, default_value_t = 4)]
        levels: u32,
        /// Attach a gray palette to the quantized image
        #[arg(short, long)]
        palette: bool,
    },

    /// indexes the colors of an image and removes the palette toward a target
    Palette {
        /// The input image
        img_file: PathBuf,
        /// The output file name
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// binary, grayscale, full-color or auto
        #[arg(short, long, default_value = "auto")]
        target: PaletteTarget,
    },
}

fn output_or_default(img_file: &Path, output: Option<PathBuf>, suffix: &str) -> Result<PathBuf> {
    if let Some(output) = output {
        return Ok(output);
    }
    let mut default = PathBuf::new();
    let Some(dir) = img_file.parent() else {
        bail!("Invalid img file");
    };
    let Some(Some(filename)) = img_file.file_stem().map(|os| os.to_str()) else {
        bail!("Invalid img file");
    };
    default.push(dir);
    default.push(format!("{filename}.{suffix}.png"));
    info!("output name: {}", default.display());
    Ok(default)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_file(true)
        .with_line_number(true)
        .init();

    match cli.command {
        Commands::Gray { img_file, output } => {
            let output = output_or_default(&img_file, output, "gray")?;
            to_gray(&img_file, &output)?;
        }
        Commands::Binarize {
            img_file,
            output,
            threshold,
            dither,
            upsample,
            lower_clip,
            upper_clip,
        } => {
            let output = output_or_default(&img_file, output, "binary")?;
            let mode = if dither {
                let options = DitherOptions::builder()
                    .lower_clip(lower_clip)
                    .upper_clip(upper_clip)
                    .build();
                BinaryMode::Dither(options)
            } else {
                BinaryMode::Threshold(threshold)
            };
            binarize(&img_file, &output, mode, upsample)?;
        }
        Commands::Scale {
            img_file,
            output,
            factor,
            width,
            height,
        } => {
            let output = output_or_default(&img_file, output, "scaled")?;
            let size = match (factor, width, height) {
                (Some(factor), _, _) => Size::Factor(factor),
                (None, None, None) => bail!("one of --factor, --width or --height is required"),
                (None, width, height) => Size::Dimensions {
                    width: width.unwrap_or(0),
                    height: height.unwrap_or(0),
                },
            };
            rescale(&img_file, &output, size)?;
        }
        Commands::Levels {
            img_file,
            output,
            levels: nlevels,
            palette,
        } => {
            let output = output_or_default(&img_file, output, "levels")?;
            levels(&img_file, &output, nlevels, palette)?;
        }
        Commands::Palette {
            img_file,
            output,
            target,
        } => {
            let output = output_or_default(&img_file, output, target.into())?;
            palette(&img_file, &output, target)?;
        }
    }
    Ok(())
}
