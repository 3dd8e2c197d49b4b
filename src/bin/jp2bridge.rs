//! jp2bridge CLI - JPEG 2000 bridge command-line utility.
//!
//! Detects JP2/J2K signatures and shows the encoder plan for a given quality.
//! With the `openjpeg` feature it also encodes and decodes through OpenJPEG.

use clap::{Parser, Subcommand, ValueEnum};
use jp2_bridge::quality::{self, CompressionRateLadder, Quality};
use jp2_bridge::signature::{self, FormatTag};
use jp2_bridge::stream::{ByteHandle, MemoryHandle, SequentialReader};
use std::fs;
use std::path::PathBuf;

/// JPEG 2000 (JP2/J2K) bridge between raw pixels and an external codec
#[derive(Parser)]
#[command(name = "jp2bridge")]
#[command(version)]
#[command(about = "Detect, plan, encode and decode JPEG 2000 images", long_about = None)]
#[command(after_help = "EXAMPLES:
    jp2bridge detect -i image.jp2
    jp2bridge plan -w 4096 -H 2048 -q 50
    jp2bridge encode -i pixels.raw -o image.jp2 -w 512 -H 512 -n 3 -q 80
    jp2bridge decode -i image.j2k -o image.ppm -f ppm

Set RUST_LOG=debug to trace codec stages.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether a file holds a JP2 container, a J2K codestream or neither
    #[command(visible_alias = "d")]
    Detect {
        /// Input file path, or '-' for standard input
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the compression rates and resolution levels an encode would use
    #[command(visible_alias = "p")]
    Plan {
        /// Image width in pixels
        #[arg(short, long)]
        width: u32,

        /// Image height in pixels
        #[arg(short = 'H', long)]
        height: u32,

        /// Quality level (1-100, 100 = lossless)
        #[arg(short, long, default_value = "100")]
        quality: i32,
    },

    /// Encode raw 8-bit pixels to JP2 or J2K
    #[cfg(feature = "openjpeg")]
    #[command(visible_alias = "e")]
    Encode {
        /// Input raw pixel file (gray, RGB or RGBA, tightly packed)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Image width in pixels
        #[arg(short, long)]
        width: u32,

        /// Image height in pixels
        #[arg(short = 'H', long)]
        height: u32,

        /// Number of color components (1=grayscale, 3=RGB, 4=RGBA)
        #[arg(short = 'n', long, default_value = "1")]
        components: u32,

        /// Output container
        #[arg(short, long, default_value = "jp2", value_enum)]
        format: Container,

        /// Quality level (1-100, 100 = lossless)
        #[arg(short, long, default_value = "100")]
        quality: i32,
    },

    /// Decode a JP2 or J2K image to raw pixels or PPM/PGM
    #[cfg(feature = "openjpeg")]
    #[command(visible_alias = "x")]
    Decode {
        /// Input file path, or '-' for standard input
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: raw (binary pixels) or ppm (Portable PixMap)
        #[arg(short, long, default_value = "raw", value_enum)]
        format: OutputFormat,
    },
}

#[cfg(feature = "openjpeg")]
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Container {
    /// JP2 boxed container
    Jp2,
    /// Bare J2K codestream
    J2k,
}

#[cfg(feature = "openjpeg")]
impl Container {
    fn format_name(self) -> &'static str {
        match self {
            Self::Jp2 => "jp2",
            Self::J2k => "j2k",
        }
    }
}

#[cfg(feature = "openjpeg")]
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Raw binary pixel data
    Raw,
    /// Portable PixMap (PPM/PGM) format
    Ppm,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Detect { input } => detect_file(&input),
        Commands::Plan {
            width,
            height,
            quality,
        } => show_plan(width, height, quality),
        #[cfg(feature = "openjpeg")]
        Commands::Encode {
            input,
            output,
            width,
            height,
            components,
            format,
            quality,
        } => codec::encode_image(&input, &output, width, height, components, format, quality),
        #[cfg(feature = "openjpeg")]
        Commands::Decode {
            input,
            output,
            format,
        } => codec::decode_image(&input, &output, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Opens `path` as a byte handle; `-` reads standard input sequentially.
fn open_input(path: &PathBuf) -> Result<Box<dyn ByteHandle>, Box<dyn std::error::Error>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(SequentialReader::new(std::io::stdin().lock())));
    }
    Ok(Box::new(MemoryHandle::from_bytes(fs::read(path)?)))
}

fn detect_file(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut handle = open_input(input)?;
    match signature::detect(handle.as_mut()) {
        FormatTag::BoxedContainer => println!("✓ {:?}: JP2 container", input),
        FormatTag::RawCodestream => println!("✓ {:?}: J2K codestream", input),
        FormatTag::Unknown => return Err(format!("{:?} is not a JPEG 2000 file", input).into()),
    }
    Ok(())
}

fn show_plan(width: u32, height: u32, quality: i32) -> Result<(), Box<dyn std::error::Error>> {
    if width == 0 || height == 0 {
        return Err(jp2_bridge::Jp2Error::InvalidDimensions { width, height }.into());
    }
    let quality = Quality::new(quality);
    let ladder = CompressionRateLadder::from_quality(quality);

    println!("Quality:           {}", quality.value());
    println!("Base rate:         {:.4}", ladder.base_rate());
    println!(
        "Mode:              {}",
        if ladder.is_reversible() {
            "reversible (lossless)"
        } else {
            "irreversible (lossy)"
        }
    );
    println!(
        "Resolution levels: {}",
        quality::resolution_levels(width.max(height))
    );
    println!("Layer rates:");
    for (layer, rate) in ladder.rates().iter().enumerate() {
        println!("  {:>2}: {:.4}", layer, rate);
    }
    Ok(())
}

#[cfg(feature = "openjpeg")]
mod codec {
    use super::{Container, OutputFormat, open_input};
    use jp2_bridge::bitmap::{self, Bitmap, PixelFormat};
    use jp2_bridge::stream::SeekableHandle;
    use jp2_bridge::{Jp2Handler, OpenJpeg, Quality};
    use std::fs;
    use std::path::PathBuf;

    pub fn encode_image(
        input: &PathBuf,
        output: &PathBuf,
        width: u32,
        height: u32,
        components: u32,
        format: Container,
        quality: i32,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let pixels = fs::read(input)?;
        let bitmap = bitmap_from_pixels(pixels, width, height, components)?;

        let file = fs::File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(output)?;
        let mut handle = SeekableHandle::new(file)?;
        let mut handler = Jp2Handler::with_device(OpenJpeg, &mut handle);
        handler.set_format(format.format_name());
        handler.set_quality(Quality::new(quality));
        handler.write(&bitmap)?;

        println!(
            "✓ Encoded {}x{} image to {:?} as {} at quality {}",
            width,
            height,
            output,
            format.format_name(),
            handler.quality().value()
        );
        Ok(())
    }

    pub fn decode_image(
        input: &PathBuf,
        output: &PathBuf,
        format: &OutputFormat,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut handle = open_input(input)?;
        let mut handler = Jp2Handler::with_device(OpenJpeg, handle.as_mut());
        let bitmap = handler.read()?;
        let (pixels, components) = pixels_from_bitmap(&bitmap);

        match format {
            OutputFormat::Raw => fs::write(output, &pixels)?,
            OutputFormat::Ppm => {
                let pixels = if components == 4 {
                    pixels
                        .chunks_exact(4)
                        .flat_map(|p| [p[0], p[1], p[2]])
                        .collect()
                } else {
                    pixels
                };
                write_ppm(output, &pixels, bitmap.width(), bitmap.height(), components)?
            }
        }

        println!(
            "✓ Decoded {}x{} image ({} components) to {:?}",
            bitmap.width(),
            bitmap.height(),
            components,
            output
        );
        Ok(())
    }

    fn bitmap_from_pixels(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        components: u32,
    ) -> Result<Bitmap, Box<dyn std::error::Error>> {
        let expected = width as usize * height as usize * components as usize;
        if pixels.len() != expected {
            return Err(format!(
                "expected {} bytes for {}x{}x{}, got {}",
                expected,
                width,
                height,
                components,
                pixels.len()
            )
            .into());
        }
        let (format, packed) = match components {
            1 => (PixelFormat::Gray8, pixels),
            3 => (
                PixelFormat::Rgb32,
                pixels
                    .chunks_exact(3)
                    .flat_map(|p| bitmap::rgb(p[0], p[1], p[2]).to_le_bytes())
                    .collect(),
            ),
            4 => (
                PixelFormat::Argb32,
                pixels
                    .chunks_exact(4)
                    .flat_map(|p| bitmap::argb(p[3], p[0], p[1], p[2]).to_le_bytes())
                    .collect(),
            ),
            n => return Err(format!("unsupported component count {}", n).into()),
        };
        Ok(Bitmap::from_raw(width, height, format, packed)?)
    }

    /// Interleaved 8-bit samples: gray, RGB or RGBA depending on the bitmap.
    fn pixels_from_bitmap(bitmap: &Bitmap) -> (Vec<u8>, u32) {
        let components = match bitmap.format() {
            PixelFormat::Argb32 => 4,
            PixelFormat::Rgb32 => 3,
            _ if bitmap.is_grayscale() => 1,
            _ => 3,
        };
        let mut pixels =
            Vec::with_capacity(bitmap.width() as usize * bitmap.height() as usize * components);
        for y in 0..bitmap.height() {
            for x in 0..bitmap.width() {
                let pixel = bitmap.pixel(x, y);
                match components {
                    1 => pixels.push(bitmap.gray_at(x, y)),
                    3 => pixels.extend([bitmap::red(pixel), bitmap::green(pixel), bitmap::blue(pixel)]),
                    _ => pixels.extend([
                        bitmap::red(pixel),
                        bitmap::green(pixel),
                        bitmap::blue(pixel),
                        bitmap::alpha(pixel),
                    ]),
                }
            }
        }
        (pixels, components as u32)
    }

    fn write_ppm(
        path: &PathBuf,
        pixels: &[u8],
        width: u32,
        height: u32,
        components: u32,
    ) -> Result<(), Box<dyn std::error::Error>> {
        use std::io::Write;
        let mut file = fs::File::create(path)?;

        if components == 1 {
            writeln!(file, "P5")?;
        } else {
            writeln!(file, "P6")?;
        }
        writeln!(file, "{} {}", width, height)?;
        writeln!(file, "255")?;
        file.write_all(pixels)?;

        Ok(())
    }
}
